use std::ffi::{c_int, c_void};

/// render thread 上执行的插件回调，参数为任务句柄
pub(crate) type RenderingEventFn = unsafe extern "C" fn(event_id: c_int);

unsafe extern "C" {
    #[link_name = "isCompatible"]
    pub(crate) fn is_compatible() -> bool;

    #[link_name = "RequestTextureMainThread"]
    pub(crate) fn request_texture_main_thread(texture: c_int, miplevel: c_int) -> c_int;

    #[link_name = "RequestComputeBufferMainThread"]
    pub(crate) fn request_compute_buffer_main_thread(buffer: c_int, buffer_size: c_int) -> c_int;

    #[link_name = "GetKickstartFunctionPtr"]
    pub(crate) fn get_kickstart_function_ptr() -> Option<RenderingEventFn>;

    #[link_name = "getfunction_update_renderThread"]
    pub(crate) fn get_update_function_ptr() -> Option<RenderingEventFn>;

    /// 返回的指针指向插件持有的内存，dispose 之后失效
    #[link_name = "getData_mainThread"]
    pub(crate) fn get_data_main_thread(event_id: c_int, buffer: *mut *mut c_void, length: *mut usize);

    #[link_name = "isRequestDone"]
    pub(crate) fn is_request_done(event_id: c_int) -> bool;

    #[link_name = "isRequestError"]
    pub(crate) fn is_request_error(event_id: c_int) -> bool;

    #[link_name = "RequestExists"]
    pub(crate) fn request_exists(event_id: c_int) -> bool;

    #[link_name = "dispose"]
    pub(crate) fn dispose(event_id: c_int);
}
