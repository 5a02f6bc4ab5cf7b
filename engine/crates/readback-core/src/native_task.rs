use bytemuck::Pod;
use readback_interface::handles::{NativeResourcePtr, TaskHandle};
use readback_interface::native_lib::RenderEvent;

use crate::error::{ReadbackError, ReadbackResult};
use crate::payload::cast_payload;
use crate::render_thread::NativeReadback;

/// native 库中的一次回读任务
///
/// 唯一拥有一个 [`TaskHandle`]，不能 Clone。
///
/// 状态：created -> pending -> {done, errored} -> disposed。
/// 对不存在的句柄调用 done / has_error / update / dispose 属于使用错误，会直接 panic。
pub struct NativeReadbackTask {
    handle: TaskHandle,
    native: NativeReadback,
    disposed: bool,
}
// new & init
impl NativeReadbackTask {
    /// 回读 texture 的某个 mip
    pub fn create_texture(native: &NativeReadback, texture: NativeResourcePtr, mip_level: u32) -> ReadbackResult<Self> {
        let handle = native.lib().request_texture(texture, mip_level).ok_or(ReadbackError::TaskAllocation)?;
        log::debug!("native readback {} <- texture {} mip {}", handle, texture, mip_level);
        Ok(Self::kickstart(native, handle))
    }

    /// 回读 buffer 的前 `size` 个字节
    pub fn create_buffer(native: &NativeReadback, buffer: NativeResourcePtr, size: usize) -> ReadbackResult<Self> {
        let handle = native.lib().request_buffer(buffer, size).ok_or(ReadbackError::TaskAllocation)?;
        log::debug!("native readback {} <- buffer {} ({} bytes)", handle, buffer, size);
        Ok(Self::kickstart(native, handle))
    }

    fn kickstart(native: &NativeReadback, handle: TaskHandle) -> Self {
        native.issue(RenderEvent::Kickstart(handle));
        Self {
            handle,
            native: native.clone(),
            disposed: false,
        }
    }
}
// 每帧的驱动
impl NativeReadbackTask {
    /// 在主线程上做簿记，并让 render thread 检查所有任务的 fence
    pub fn update_all(native: &NativeReadback) {
        native.lib().update_main_thread();
        native.issue(RenderEvent::AdvanceAll);
    }

    /// 让 render thread 检查这个任务的 fence
    pub fn update(&self) {
        self.assert_valid("update");
        self.native.issue(RenderEvent::Advance(self.handle));
    }
}
// 状态查询
impl NativeReadbackTask {
    /// native 库是否仍然记录着这个句柄
    ///
    /// dispose 之后，或者 native 库在内部回收之后，返回 false。
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.disposed && self.native.lib().task_exists(self.handle)
    }

    pub fn done(&self) -> bool {
        self.assert_valid("done");
        self.native.lib().task_done(self.handle)
    }

    pub fn has_error(&self) -> bool {
        self.assert_valid("has_error");
        self.native.lib().task_error(self.handle)
    }

    #[inline]
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    fn assert_valid(&self, op: &str) {
        assert!(
            self.is_valid(),
            "readback {} is not valid (disposed or reclaimed), cannot call {}",
            self.handle,
            op
        );
    }
}
// 数据
impl NativeReadbackTask {
    /// 把结果拷贝到调用方自己的内存中
    pub fn raw_data(&self) -> ReadbackResult<Vec<u8>> {
        if !self.done() {
            return Err(ReadbackError::NotReady);
        }
        if self.has_error() {
            return Err(ReadbackError::Failed);
        }

        let mut bytes = Vec::new();
        if !self.native.lib().copy_task_data(self.handle, &mut bytes) {
            return Err(ReadbackError::NotReady);
        }
        Ok(bytes)
    }

    /// 把结果解释为 `T` 的数组
    pub fn get_data<T: Pod>(&self) -> ReadbackResult<Vec<T>> {
        let bytes = self.raw_data()?;
        cast_payload(&bytes)
    }

    /// 释放 native 库中的任务和它持有的内存
    ///
    /// 只能在 done 之后调用一次。
    pub fn dispose(&mut self) {
        self.assert_valid("dispose");
        assert!(
            self.native.lib().task_done(self.handle),
            "readback {} is still pending, it cannot be disposed",
            self.handle
        );

        self.native.lib().dispose_task(self.handle);
        self.disposed = true;
        log::trace!("dispose {}", self.handle);
    }
}
impl Drop for NativeReadbackTask {
    fn drop(&mut self) {
        if !self.disposed && self.native.warn_on_leaked_tasks() && self.native.lib().task_exists(self.handle) {
            log::warn!("readback {} dropped without dispose, the native library keeps its memory", self.handle);
        }
    }
}
