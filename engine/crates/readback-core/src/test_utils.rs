use std::sync::Arc;

use readback_headless::HeadlessGpu;
use readback_interface::host::GraphicsHost;
use readback_interface::native_lib::NativeReadbackLib;

use crate::context::ReadbackContext;
use crate::settings::{ReadbackSettings, RenderThreadMode};

/// 使用 headless 设备、手动执行 render event 的 context
pub(crate) fn manual_context(gpu: &Arc<HeadlessGpu>) -> ReadbackContext {
    readback_crate_tools::init_log::init_log(log::LevelFilter::Debug);

    let settings = ReadbackSettings {
        render_thread: RenderThreadMode::Manual,
        ..Default::default()
    };
    let host: Arc<dyn GraphicsHost> = gpu.clone();
    ReadbackContext::new(host, gpu.clone(), settings).unwrap()
}

/// 使用指定的 native 库、手动执行 render event 的 context
pub(crate) fn manual_context_with_lib(gpu: &Arc<HeadlessGpu>, lib: Arc<dyn NativeReadbackLib>) -> ReadbackContext {
    readback_crate_tools::init_log::init_log(log::LevelFilter::Debug);

    let settings = ReadbackSettings {
        render_thread: RenderThreadMode::Manual,
        ..Default::default()
    };
    let host: Arc<dyn GraphicsHost> = gpu.clone();
    ReadbackContext::new(host, lib, settings).unwrap()
}
