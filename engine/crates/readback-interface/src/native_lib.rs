use crate::handles::{NativeResourcePtr, TaskHandle};

/// 需要在 render thread 上执行的事件
///
/// 主线程只负责发送，不会等待事件执行完成。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RenderEvent {
    /// 启动任务：拷贝数据到 staging 内存并插入 fence
    Kickstart(TaskHandle),
    /// 检查单个任务的 fence
    Advance(TaskHandle),
    /// 检查所有任务的 fence
    AdvanceAll,
    /// 通知 render thread 退出
    Shutdown,
}

/// 基于句柄的 native 回读库
///
/// 对应 native 插件导出的 C ABI。方法按照调用线程分为两组：
/// - main thread：创建、查询、取数据、释放
/// - render thread：kickstart / advance，只能在拥有图形上下文的线程上调用
///
/// 对不存在的句柄调用查询方法时，实现应当返回 false 而不是崩溃；
/// 生命周期的检查由上层负责。
pub trait NativeReadbackLib: Send + Sync {
    /// 当前图形后端是否能使用这个库
    fn is_compatible(&self) -> bool;

    // main thread
    fn request_texture(&self, texture: NativeResourcePtr, mip_level: u32) -> Option<TaskHandle>;
    fn request_buffer(&self, buffer: NativeResourcePtr, size: usize) -> Option<TaskHandle>;
    fn task_exists(&self, handle: TaskHandle) -> bool;
    fn task_done(&self, handle: TaskHandle) -> bool;
    fn task_error(&self, handle: TaskHandle) -> bool;

    /// 把任务结果从 native 内存拷贝到 `dst`（会先清空 `dst`）
    ///
    /// 任务尚未完成时返回 false，`dst` 保持为空。
    fn copy_task_data(&self, handle: TaskHandle, dst: &mut Vec<u8>) -> bool;

    /// 释放任务以及它持有的 native 内存，之后句柄不再存在
    fn dispose_task(&self, handle: TaskHandle);

    /// 每帧一次，在主线程上做内部的簿记工作
    fn update_main_thread(&self);

    // render thread
    fn kickstart(&self, handle: TaskHandle);
    fn advance(&self, handle: TaskHandle);
    fn advance_all(&self);
}
