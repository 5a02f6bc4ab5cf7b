//! Readback 工具集
//!
//! 目前只提供日志初始化，供 app 和测试共用。

pub mod init_log;
