use std::collections::BTreeSet;
use std::ffi::{c_int, c_void};
use std::sync::{Mutex, MutexGuard, PoisonError};

use readback_interface::handles::{NativeResourcePtr, TaskHandle};
use readback_interface::native_lib::NativeReadbackLib;

use crate::ffi::{self, RenderingEventFn};

/// 基于 native 插件的回读库
///
/// 插件本身只提供针对单个任务的 update 回调，这里记录所有存活的句柄，
/// 用来实现 [`NativeReadbackLib::advance_all`]。
pub struct PluginReadbackLib {
    kickstart_fn: RenderingEventFn,
    update_fn: RenderingEventFn,

    /// 由本对象创建、尚未 dispose 的句柄
    live_handles: Mutex<BTreeSet<TaskHandle>>,
}
// new & init
impl PluginReadbackLib {
    /// 加载插件导出的 render thread 回调
    ///
    /// 插件没有返回回调时返回 None。
    pub fn new() -> Option<Self> {
        let (kickstart_fn, update_fn) =
            unsafe { (ffi::get_kickstart_function_ptr()?, ffi::get_update_function_ptr()?) };

        log::info!("AsyncGPUReadbackPlugin loaded, compatible: {}", unsafe { ffi::is_compatible() });
        Some(Self {
            kickstart_fn,
            update_fn,
            live_handles: Mutex::new(BTreeSet::new()),
        })
    }
}
// tools
impl PluginReadbackLib {
    fn live_handles(&self) -> MutexGuard<'_, BTreeSet<TaskHandle>> {
        self.live_handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 插件 API 使用 GL name（int）作为资源标识
    fn gl_name(ptr: NativeResourcePtr) -> Option<c_int> {
        match c_int::try_from(ptr.0) {
            Ok(name) => Some(name),
            Err(_) => {
                log::error!("{} does not fit into a GL name", ptr);
                None
            }
        }
    }

    /// 插件的 event id 从 1 开始，非正数表示分配失败
    fn track(&self, event_id: c_int) -> Option<TaskHandle> {
        if event_id <= 0 {
            log::error!("AsyncGPUReadbackPlugin refused the request (event id {})", event_id);
            return None;
        }
        let handle = TaskHandle(event_id);
        self.live_handles().insert(handle);
        Some(handle)
    }
}

impl NativeReadbackLib for PluginReadbackLib {
    fn is_compatible(&self) -> bool {
        unsafe { ffi::is_compatible() }
    }

    fn request_texture(&self, texture: NativeResourcePtr, mip_level: u32) -> Option<TaskHandle> {
        let texture = Self::gl_name(texture)?;
        let mip_level = c_int::try_from(mip_level).ok()?;
        let event_id = unsafe { ffi::request_texture_main_thread(texture, mip_level) };
        self.track(event_id)
    }

    fn request_buffer(&self, buffer: NativeResourcePtr, size: usize) -> Option<TaskHandle> {
        let buffer = Self::gl_name(buffer)?;
        let Ok(size) = c_int::try_from(size) else {
            log::error!("buffer readback of {} bytes is too large for the plugin", size);
            return None;
        };
        let event_id = unsafe { ffi::request_compute_buffer_main_thread(buffer, size) };
        self.track(event_id)
    }

    fn task_exists(&self, handle: TaskHandle) -> bool {
        unsafe { ffi::request_exists(handle.raw()) }
    }

    fn task_done(&self, handle: TaskHandle) -> bool {
        unsafe { ffi::is_request_done(handle.raw()) }
    }

    fn task_error(&self, handle: TaskHandle) -> bool {
        unsafe { ffi::is_request_error(handle.raw()) }
    }

    fn copy_task_data(&self, handle: TaskHandle, dst: &mut Vec<u8>) -> bool {
        dst.clear();

        let mut buffer: *mut c_void = std::ptr::null_mut();
        let mut length: usize = 0;
        unsafe { ffi::get_data_main_thread(handle.raw(), &mut buffer, &mut length) };
        if buffer.is_null() {
            return false;
        }

        // 插件的内存在下一次 dispose / update 之后可能失效，立即拷贝
        let bytes = unsafe { std::slice::from_raw_parts(buffer as *const u8, length) };
        dst.extend_from_slice(bytes);
        true
    }

    fn dispose_task(&self, handle: TaskHandle) {
        self.live_handles().remove(&handle);
        unsafe { ffi::dispose(handle.raw()) };
    }

    fn update_main_thread(&self) {
        // 忘掉插件已经不再追踪的句柄
        self.live_handles().retain(|handle| unsafe { ffi::request_exists(handle.raw()) });
    }

    fn kickstart(&self, handle: TaskHandle) {
        unsafe { (self.kickstart_fn)(handle.raw()) };
    }

    fn advance(&self, handle: TaskHandle) {
        unsafe { (self.update_fn)(handle.raw()) };
    }

    fn advance_all(&self) {
        let handles: Vec<TaskHandle> = self.live_handles().iter().copied().collect();
        for handle in handles {
            unsafe { (self.update_fn)(handle.raw()) };
        }
    }
}
