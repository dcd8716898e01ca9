//! Submission state machine
//!
//! Each poll of the judge yields a `StatusReport`; `SubmissionTracker` folds
//! the reports into `SubmissionState`s. The number of test cases is taken from
//! the first report that shows any, and the number of passed cases never goes
//! down.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::status::JudgeStatus;

/// Raw status payload returned by the judge
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    pub status_id: u32,
    /// 1-based index of the test case being judged
    #[serde(default)]
    pub testcase_index: i64,
    #[serde(default)]
    pub row_html: String,
    #[serde(default)]
    pub feedback_html: String,
}

impl StatusReport {
    pub fn status(&self) -> JudgeStatus {
        JudgeStatus::from_code(self.status_id)
    }

    /// One `<i` marker per test case plus one for the header
    pub fn total_cases(&self) -> u32 {
        let markers = self.row_html.matches("<i").count();
        u32::try_from(markers.saturating_sub(1)).unwrap_or(u32::MAX)
    }

    pub fn passed_cases(&self) -> u32 {
        u32::try_from(self.testcase_index.saturating_sub(1).max(0)).unwrap_or(u32::MAX)
    }

    /// Compiler output shown by the judge, if any
    pub fn compile_message(&self) -> Option<String> {
        static PRE: OnceLock<Regex> = OnceLock::new();
        let pre = PRE.get_or_init(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid regex"));

        let captures = pre.captures(&self.feedback_html)?;
        let text = html_text(&captures[1]);
        (!text.trim().is_empty()).then_some(text)
    }

    /// CPU time cell of the submission row, e.g. `0.01 s`
    pub fn cpu_time(&self) -> Option<String> {
        static CPU: OnceLock<Regex> = OnceLock::new();
        let cpu = CPU.get_or_init(|| {
            Regex::new(r#"(?is)<[a-z]+[^>]*data-type="cpu"[^>]*>(.*?)</"#).expect("valid regex")
        });

        let captures = cpu.captures(&self.row_html)?;
        let text = html_text(&captures[1]);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Strip tags and decode the common entities
fn html_text(markup: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    tag.replace_all(markup, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Preparing {
        status_message: String,
    },
    /// Compilation failed on the judge
    PrepareFailed {
        message: String,
    },
    Running {
        total_cases: u32,
        passed_cases: u32,
    },
    Accepted {
        total_cases: u32,
    },
    Failed {
        status: JudgeStatus,
        total_cases: u32,
        passed_cases: u32,
        message: String,
    },
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::PrepareFailed { .. }
                | SubmissionState::Accepted { .. }
                | SubmissionState::Failed { .. }
        )
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionState::Accepted { .. })
    }
}

#[derive(Debug, Default)]
pub struct SubmissionTracker {
    total_cases: Option<u32>,
    passed_cases: u32,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, report: &StatusReport) -> SubmissionState {
        if self.total_cases.is_none() {
            let total = report.total_cases();
            if total > 0 {
                self.total_cases = Some(total);
            }
        }
        let total_cases = self.total_cases.unwrap_or(0);
        self.passed_cases = self.passed_cases.max(report.passed_cases()).min(total_cases);
        let passed_cases = self.passed_cases;

        match report.status() {
            JudgeStatus::CompileError => {
                let mut message = JudgeStatus::CompileError.to_string();
                if let Some(detail) = report.compile_message() {
                    message.push('\n');
                    message.push_str(detail.trim_end());
                }
                SubmissionState::PrepareFailed { message }
            }
            status if status.is_preparing() => SubmissionState::Preparing {
                status_message: status.to_string(),
            },
            JudgeStatus::Running => SubmissionState::Running {
                total_cases,
                passed_cases,
            },
            JudgeStatus::Accepted => SubmissionState::Accepted { total_cases },
            status => {
                let message = match report.cpu_time() {
                    Some(cpu) => format!("{} ({})", status, cpu),
                    None => status.to_string(),
                };
                SubmissionState::Failed {
                    status,
                    total_cases,
                    passed_cases,
                    message,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A judge row with `cases` test case markers
    pub(crate) fn row(cases: usize) -> String {
        let mut html = String::from(r#"<td data-type="testcases"><i class="header"></i>"#);
        for _ in 0..cases {
            html.push_str(r#"<i class="is-empty"></i>"#);
        }
        html.push_str(r#"</td><td data-type="cpu">0.01&nbsp;s</td>"#);
        html
    }

    pub(crate) fn report(status_id: u32, testcase_index: i64, row_html: &str) -> StatusReport {
        StatusReport {
            status_id,
            testcase_index,
            row_html: row_html.to_string(),
            feedback_html: String::new(),
        }
    }

    #[test]
    fn test_accepted_run() {
        let rows = row(3);
        let reports = [
            report(2, 0, ""),
            report(3, 0, ""),
            report(5, 1, &rows),
            report(5, 2, &rows),
            report(5, 3, &rows),
            report(16, 4, &rows),
        ];

        let mut tracker = SubmissionTracker::new();
        let states: Vec<_> = reports.iter().map(|r| tracker.advance(r)).collect();

        assert_eq!(
            states,
            [
                SubmissionState::Preparing {
                    status_message: "Waiting for compile".to_string()
                },
                SubmissionState::Preparing {
                    status_message: "Compiling".to_string()
                },
                SubmissionState::Running {
                    total_cases: 3,
                    passed_cases: 0
                },
                SubmissionState::Running {
                    total_cases: 3,
                    passed_cases: 1
                },
                SubmissionState::Running {
                    total_cases: 3,
                    passed_cases: 2
                },
                SubmissionState::Accepted { total_cases: 3 },
            ]
        );
    }

    #[test]
    fn test_total_is_fixed_and_passed_never_regresses() {
        let mut tracker = SubmissionTracker::new();
        tracker.advance(&report(5, 3, &row(4)));

        assert_eq!(
            tracker.advance(&report(5, 1, &row(7))),
            SubmissionState::Running {
                total_cases: 4,
                passed_cases: 2
            }
        );
        // Never more passed than there are cases
        assert_eq!(
            tracker.advance(&report(5, 40, &row(4))),
            SubmissionState::Running {
                total_cases: 4,
                passed_cases: 4
            }
        );
    }

    #[test]
    fn test_extreme_testcase_index_is_clamped() {
        assert_eq!(report(5, i64::MIN, "").passed_cases(), 0);
        assert_eq!(report(5, -3, "").passed_cases(), 0);
        assert_eq!(report(5, i64::MAX, "").passed_cases(), u32::MAX);

        let mut tracker = SubmissionTracker::new();
        let state = tracker.advance(&report(5, i64::MIN, &row(2)));
        assert_eq!(
            state,
            SubmissionState::Running {
                total_cases: 2,
                passed_cases: 0
            }
        );
    }

    #[test]
    fn test_wrong_answer_carries_cpu_time() {
        let mut tracker = SubmissionTracker::new();
        let state = tracker.advance(&report(14, 2, &row(3)));
        assert_eq!(
            state,
            SubmissionState::Failed {
                status: JudgeStatus::WrongAnswer,
                total_cases: 3,
                passed_cases: 1,
                message: "Wrong Answer (0.01 s)".to_string(),
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_unknown_status_is_terminal_failure() {
        let mut tracker = SubmissionTracker::new();
        let state = tracker.advance(&report(99, 0, ""));
        assert!(state.is_terminal());
        match state {
            SubmissionState::Failed { status, message, .. } => {
                assert_eq!(status, JudgeStatus::Unknown(99));
                assert_eq!(message, "Unknown status 99");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_compile_error_extracts_message() {
        let mut tracker = SubmissionTracker::new();
        let state = tracker.advance(&StatusReport {
            status_id: 8,
            feedback_html: "<div><pre>main.cpp:1: error: &#39;x&#39; was not declared &amp; more\n</pre></div>"
                .to_string(),
            ..StatusReport::default()
        });
        assert_eq!(
            state,
            SubmissionState::PrepareFailed {
                message: "Compile Error\nmain.cpp:1: error: 'x' was not declared & more".to_string()
            }
        );
    }

    #[test]
    fn test_compile_error_without_markup() {
        let mut tracker = SubmissionTracker::new();
        let state = tracker.advance(&StatusReport {
            status_id: 8,
            feedback_html: "<div>nothing useful</div>".to_string(),
            ..StatusReport::default()
        });
        assert_eq!(
            state,
            SubmissionState::PrepareFailed {
                message: "Compile Error".to_string()
            }
        );
    }

    #[test]
    fn test_report_parses_from_json() {
        let report: StatusReport = serde_json::from_str(
            r#"{"status_id": 5, "testcase_index": 2, "row_html": "<i></i><i></i>", "feedback_html": "", "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(report.status(), JudgeStatus::Running);
        assert_eq!(report.total_cases(), 1);
        assert_eq!(report.passed_cases(), 1);
    }
}
