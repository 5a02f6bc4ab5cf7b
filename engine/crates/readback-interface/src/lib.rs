//! Readback 层与外部协作者之间的边界
//!
//! - [`host::GraphicsHost`]：宿主引擎，提供能力查询、资源查询以及引擎自带的异步回读
//! - [`native_lib::NativeReadbackLib`]：基于句柄的 native 回读库（C ABI 的抽象）
//! - [`handles`]：跨边界传递的各种标识

pub mod frame_counter;
pub mod handles;
pub mod host;
pub mod native_lib;
pub mod resource;
