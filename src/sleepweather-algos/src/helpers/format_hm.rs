use chrono::TimeDelta;

pub trait FormatHM {
    fn format_hm(&self) -> String;
}

impl FormatHM for TimeDelta {
    fn format_hm(&self) -> String {
        let total = self.num_minutes();
        format!("{}h {:02}min", total / 60, total % 60)
    }
}

impl FormatHM for usize {
    fn format_hm(&self) -> String {
        TimeDelta::minutes(*self as i64).format_hm()
    }
}
