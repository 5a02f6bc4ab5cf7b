//! native 回读插件 `AsyncGPUReadbackPlugin` 的绑定
//!
//! 插件以整数句柄管理回读任务，render thread 上的工作通过两个函数指针完成
//! （kickstart 和 update），由宿主在拥有图形上下文的线程上调用。
//! [`PluginReadbackLib`] 把这些接口适配为
//! [`NativeReadbackLib`](readback_interface::native_lib::NativeReadbackLib)。

mod ffi;
pub mod plugin_lib;

pub use plugin_lib::PluginReadbackLib;
