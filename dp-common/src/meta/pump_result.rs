use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PumpStatus {
    Ok,
    MissingData,
    VerifiedOk,
    Partial { actual: i64, target: usize },
    VerifyFail(String),
}

impl std::fmt::Display for PumpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PumpStatus::Ok => write!(f, "OK"),
            PumpStatus::MissingData => write!(f, "MISSING_DATA"),
            PumpStatus::VerifiedOk => write!(f, "VERIFIED_OK"),
            PumpStatus::Partial { actual, target } => {
                write!(f, "PARTIAL: {}/{}", actual, target)
            }
            PumpStatus::VerifyFail(error) => write!(f, "VERIFY_FAIL: {}", error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PumpResult {
    pub table_name: String,
    /// the originally requested count, before identity caps
    pub target: usize,
    /// verified row delta
    pub actual: i64,
    pub status: PumpStatus,
    pub error_msg: String,
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(PumpStatus::Ok.to_string(), "OK");
        assert_eq!(PumpStatus::MissingData.to_string(), "MISSING_DATA");
        assert_eq!(PumpStatus::VerifiedOk.to_string(), "VERIFIED_OK");
        assert_eq!(
            PumpStatus::Partial {
                actual: 37,
                target: 100
            }
            .to_string(),
            "PARTIAL: 37/100"
        );
        assert_eq!(
            PumpStatus::VerifyFail("table gone".to_string()).to_string(),
            "VERIFY_FAIL: table gone"
        );
    }
}
