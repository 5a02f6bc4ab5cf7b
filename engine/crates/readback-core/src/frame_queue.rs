use std::collections::VecDeque;

use crate::context::ReadbackContext;
use crate::error::ReadbackResult;
use crate::request::ReadbackRequest;
use crate::settings::ReadbackSettings;
use crate::starter::ReadbackStarter;

/// 一次 [`ReadbackQueue::update`] 的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// 交给 sink 的请求数
    pub completed: usize,
    /// 出错被丢弃的请求数
    pub failed: usize,
    /// 已经失效被丢弃的请求数
    pub dropped: usize,
    /// 仍在队列中的请求数
    pub pending: usize,
}

/// 按提交顺序处理回读结果的 FIFO 队列
///
/// 队头的请求没有完成时，后面已经完成的请求也要等待。
pub struct ReadbackQueue {
    requests: VecDeque<ReadbackRequest>,
    capacity: usize,
}
// new & init
impl ReadbackQueue {
    /// 容量至少为 1，传入 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            log::warn!("readback queue capacity 0 is not usable, use 1 instead");
            1
        } else {
            capacity
        };
        Self {
            requests: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_settings(settings: &ReadbackSettings) -> Self {
        Self::new(settings.queue_capacity)
    }
}
// 提交
impl ReadbackQueue {
    /// 队列满时拒绝，并把请求还给调用方
    pub fn push(&mut self, request: ReadbackRequest) -> Result<(), ReadbackRequest> {
        if self.is_full() {
            log::warn!("Too many readback requests ({}), the new one is rejected", self.capacity);
            return Err(request);
        }
        self.requests.push_back(request);
        Ok(())
    }

    /// 先检查容量再发起回读，被拒绝的提交不会创建任何任务
    ///
    /// 返回是否真的提交了请求。
    pub fn submit_from(&mut self, ctx: &mut ReadbackContext, starter: &dyn ReadbackStarter) -> ReadbackResult<bool> {
        if self.is_full() {
            log::warn!("Too many readback requests ({}), skip this frame", self.capacity);
            return Ok(false);
        }
        let request = starter.start_readback(ctx)?;
        self.requests.push_back(request);
        Ok(true)
    }
}
// update
impl ReadbackQueue {
    /// 每帧调用：从队头开始推进并处理已经结束的请求
    ///
    /// 只推进队头，后面的请求由每帧的全局更新推进。
    /// 完成的请求在交给 `sink` 之后立即 dispose，`sink` 中取到的数据需要自己保存。
    /// 出错但尚未 done 的请求留在队头，直到可以 dispose 为止。
    pub fn update(&mut self, mut sink: impl FnMut(&ReadbackRequest)) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(head) = self.requests.front_mut() {
            if !head.valid() {
                log::warn!("drop a readback request that is no longer valid");
                report.dropped += 1;
                self.requests.pop_front();
                continue;
            }

            head.update();
            if head.has_error() {
                if !head.done() {
                    break;
                }
                log::error!("GPU readback error detected");
                head.dispose();
                report.failed += 1;
            } else if head.done() {
                sink(head);
                head.dispose();
                report.completed += 1;
            } else {
                break;
            }
            self.requests.pop_front();
        }

        report.pending = self.requests.len();
        report
    }
}
// getters
impl ReadbackQueue {
    #[inline]
    pub fn len(&self) -> usize {
        self.requests.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
    #[inline]
    pub fn is_full(&self) -> bool {
        self.requests.len() >= self.capacity
    }
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn iter(&self) -> impl Iterator<Item = &ReadbackRequest> {
        self.requests.iter()
    }
}
