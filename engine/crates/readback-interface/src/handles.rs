use std::fmt::{Display, Formatter};

use slotmap::new_key_type;

// 引擎侧的资源标识，销毁后不会再复活
new_key_type! {
    pub struct ResourceHandle;
}

/// 图形驱动内部的资源标识（例如 OpenGL 的 texture / buffer name）
///
/// 由图形子系统持有，回读层只记录它，不会销毁底层资源。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NativeResourcePtr(pub u64);

impl Display for NativeResourcePtr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "native#{}", self.0)
    }
}

/// native 库为一次回读任务分配的整数句柄
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TaskHandle(pub i32);

impl TaskHandle {
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl Display for TaskHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}
