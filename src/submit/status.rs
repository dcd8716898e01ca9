//! Judge status codes

use std::fmt;

/// Status reported by the judge for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeStatus {
    New,
    WaitingForCompile,
    Compiling,
    WaitingForRun,
    Running,
    JudgeError,
    SubmissionError,
    CompileError,
    RunTimeError,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    TimeLimitExceeded,
    IllegalFunction,
    WrongAnswer,
    Accepted,
    Unknown(u32),
}

impl JudgeStatus {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => JudgeStatus::New,
            2 => JudgeStatus::WaitingForCompile,
            3 => JudgeStatus::Compiling,
            4 => JudgeStatus::WaitingForRun,
            5 => JudgeStatus::Running,
            6 => JudgeStatus::JudgeError,
            7 => JudgeStatus::SubmissionError,
            8 => JudgeStatus::CompileError,
            9 => JudgeStatus::RunTimeError,
            10 => JudgeStatus::MemoryLimitExceeded,
            11 => JudgeStatus::OutputLimitExceeded,
            12 => JudgeStatus::TimeLimitExceeded,
            13 => JudgeStatus::IllegalFunction,
            14 => JudgeStatus::WrongAnswer,
            16 => JudgeStatus::Accepted,
            other => JudgeStatus::Unknown(other),
        }
    }

    /// Still waiting for the judge to start running test cases
    pub fn is_preparing(&self) -> bool {
        matches!(
            self,
            JudgeStatus::New
                | JudgeStatus::WaitingForCompile
                | JudgeStatus::Compiling
                | JudgeStatus::WaitingForRun
        )
    }
}

impl fmt::Display for JudgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JudgeStatus::New => "New",
            JudgeStatus::WaitingForCompile => "Waiting for compile",
            JudgeStatus::Compiling => "Compiling",
            JudgeStatus::WaitingForRun => "Waiting for run",
            JudgeStatus::Running => "Running",
            JudgeStatus::JudgeError => "Judge Error",
            JudgeStatus::SubmissionError => "Submission Error",
            JudgeStatus::CompileError => "Compile Error",
            JudgeStatus::RunTimeError => "Run Time Error",
            JudgeStatus::MemoryLimitExceeded => "Memory Limit Exceeded",
            JudgeStatus::OutputLimitExceeded => "Output Limit Exceeded",
            JudgeStatus::TimeLimitExceeded => "Time Limit Exceeded",
            JudgeStatus::IllegalFunction => "Illegal Function",
            JudgeStatus::WrongAnswer => "Wrong Answer",
            JudgeStatus::Accepted => "Accepted",
            JudgeStatus::Unknown(code) => return write!(f, "Unknown status {}", code),
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        for code in [0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 16] {
            let status = JudgeStatus::from_code(code);
            assert!(!matches!(status, JudgeStatus::Unknown(_)), "code {code}");
        }
        assert_eq!(JudgeStatus::from_code(8), JudgeStatus::CompileError);
        assert_eq!(JudgeStatus::from_code(16), JudgeStatus::Accepted);
    }

    #[test]
    fn test_gaps_are_unknown() {
        assert_eq!(JudgeStatus::from_code(1), JudgeStatus::Unknown(1));
        assert_eq!(JudgeStatus::from_code(15), JudgeStatus::Unknown(15));
        assert_eq!(JudgeStatus::from_code(99).to_string(), "Unknown status 99");
    }

    #[test]
    fn test_preparing_statuses() {
        assert!(JudgeStatus::New.is_preparing());
        assert!(JudgeStatus::WaitingForRun.is_preparing());
        assert!(!JudgeStatus::Running.is_preparing());
        assert!(!JudgeStatus::Unknown(1).is_preparing());
    }

    #[test]
    fn test_names() {
        assert_eq!(JudgeStatus::RunTimeError.to_string(), "Run Time Error");
        assert_eq!(JudgeStatus::WaitingForCompile.to_string(), "Waiting for compile");
    }
}
