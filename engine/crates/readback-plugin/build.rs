/// 插件的链接
///
/// 设置 `READBACK_PLUGIN_DIR` 指向 `libAsyncGPUReadbackPlugin` 所在目录时才会链接；
/// 否则只编译绑定本身，使用它的二进制需要自行提供链接参数。
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=READBACK_PLUGIN_DIR");

    if let Ok(plugin_dir) = std::env::var("READBACK_PLUGIN_DIR") {
        println!("cargo:rustc-link-search=native={}", plugin_dir);
        println!("cargo:rustc-link-lib=dylib=AsyncGPUReadbackPlugin");
    }
}
