//! 页面探测模块
//!
//! 提供单次、可取消、结果结构化的HTTP页面探测

pub mod checker;
pub mod deadline;
pub mod result;

// 重新导出主要类型
pub use checker::{HttpPageProbe, PageProbe, ProbeSettings, DEFAULT_TIMEOUT_MS};
pub use deadline::Deadline;
pub use result::{ProbeErrorKind, ProbeFailure, ProbeKind, ProbeResult};
