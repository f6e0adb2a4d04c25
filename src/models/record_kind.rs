use serde::Serialize;

/// The two independent transactional domains of the local queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Activity,
    Attendance,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Activity, RecordKind::Attendance];

    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Activity => "activities_queue",
            RecordKind::Attendance => "attendance_queue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Activity => "activity",
            RecordKind::Attendance => "attendance",
        }
    }

    /// Helper: convert input code from CLI (singular or plural, any case)
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "activity" | "activities" => Some(RecordKind::Activity),
            "attendance" => Some(RecordKind::Attendance),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
