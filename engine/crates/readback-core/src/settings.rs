use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// render event 的执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderThreadMode {
    /// 启动一个专用线程执行 render event
    #[default]
    Dedicated,
    /// 由宿主在自己的 render loop 中调用
    /// [`ReadbackContext::pump_render_events`](crate::ReadbackContext::pump_render_events)
    Manual,
}

/// 回读相关的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadbackSettings {
    /// [`ReadbackQueue`](crate::ReadbackQueue) 最多同时持有的请求数
    pub queue_capacity: usize,
    pub render_thread: RenderThreadMode,
    /// native 任务没有 dispose 就被丢弃时是否打印警告
    pub warn_on_leaked_tasks: bool,
}

impl Default for ReadbackSettings {
    fn default() -> Self {
        Self {
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            render_thread: RenderThreadMode::Dedicated,
            warn_on_leaked_tasks: true,
        }
    }
}

impl ReadbackSettings {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let settings: ReadbackSettings = toml::from_str(content).context("解析 readback 配置失败")?;
        anyhow::ensure!(settings.queue_capacity > 0, "queue_capacity 必须大于 0");
        Ok(settings)
    }

    /// 从 TOML 文件加载配置，缺省的字段使用默认值
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).with_context(|| format!("读取配置文件失败: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content).with_context(|| format!("加载配置失败: {:?}", path.as_ref()))
    }
}
