// 该文件是 Menpai （门牌） 项目的一部分。
// src/task.rs - 任务调度：单帧任务与只保留最新帧的连续任务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  fmt::Display,
  sync::{
    Arc, Condvar, Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
  thread,
  time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
  frame::{FrameGuard, RgbNhwcFrame, SensorFrame},
  model::{DetectResult, Model},
  output::{Overlay, Render},
  pipeline::{DetectionPipeline, FrameOutcome},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: DetectionPipeline<M>, output: O) -> Result<TaskStats, Self::Error>;
}

/// 任务结束时的帧计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
  /// 从帧源取出的帧
  pub submitted: usize,
  /// 得到检测结果并发布的帧
  pub processed: usize,
  /// 等待期间被新帧替换，或在停止时仍未处理的帧
  pub dropped: usize,
  /// 引擎不可用或单帧处理失败的帧
  pub failed: usize,
}

#[derive(Default)]
struct StatsCounter {
  submitted: AtomicUsize,
  processed: AtomicUsize,
  dropped: AtomicUsize,
  failed: AtomicUsize,
}

impl StatsCounter {
  fn snapshot(&self) -> TaskStats {
    TaskStats {
      submitted: self.submitted.load(Ordering::Relaxed),
      processed: self.processed.load(Ordering::Relaxed),
      dropped: self.dropped.load(Ordering::Relaxed),
      failed: self.failed.load(Ordering::Relaxed),
    }
  }

  fn record(&self, outcome: &FrameOutcome) {
    match outcome {
      FrameOutcome::Detected(_) => self.processed.fetch_add(1, Ordering::Relaxed),
      FrameOutcome::EngineUnavailable | FrameOutcome::Dropped(_) => {
        self.failed.fetch_add(1, Ordering::Relaxed)
      }
    };
  }
}

struct SlotState<T> {
  pending: Option<T>,
  closed: bool,
}

/// 最多容纳一个待处理项，新项替换旧项
pub struct LatestSlot<T> {
  state: Mutex<SlotState<T>>,
  ready: Condvar,
}

impl<T> Default for LatestSlot<T> {
  fn default() -> Self {
    Self {
      state: Mutex::new(SlotState {
        pending: None,
        closed: false,
      }),
      ready: Condvar::new(),
    }
  }
}

impl<T> LatestSlot<T> {
  fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// 放入新项，返回被替换的旧项；关闭后直接退回新项
  pub fn offer(&self, item: T) -> Option<T> {
    let mut state = self.lock();
    if state.closed {
      return Some(item);
    }
    let displaced = state.pending.replace(item);
    self.ready.notify_one();
    displaced
  }

  /// 阻塞直到有待处理项；关闭且为空时返回 `None`
  pub fn take(&self) -> Option<T> {
    let mut state = self.lock();
    loop {
      if let Some(item) = state.pending.take() {
        return Some(item);
      }
      if state.closed {
        return None;
      }
      state = self
        .ready
        .wait(state)
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    }
  }

  pub fn close(&self) {
    self.lock().closed = true;
    self.ready.notify_all();
  }
}

/// 离开作用域时关闭槽，帧源线程 panic 时工作循环也能退出
struct CloseOnDrop<T>(Arc<LatestSlot<T>>);

impl<T> Drop for CloseOnDrop<T> {
  fn drop(&mut self) {
    self.0.close();
  }
}

pub struct OneShotTask;

impl<F, I, M, O> Task<I, M, O> for OneShotTask
where
  F: SensorFrame,
  I: Iterator<Item = F>,
  M: Model<Input = RgbNhwcFrame, Output = Vec<f32>>,
  M::Error: Display,
  O: Render<DetectResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: DetectionPipeline<M>, output: O) -> Result<TaskStats, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let mut stats = TaskStats {
      submitted: 1,
      ..TaskStats::default()
    };
    info!("输入帧获取成功，开始处理...");

    let now = Instant::now();
    let outcome = pipeline.process(FrameGuard::new(frame), output.surface_size());
    info!("处理完成，耗时: {:.2?}", now.elapsed());

    match outcome {
      FrameOutcome::Detected(result) => {
        stats.processed = 1;
        output.render_result(&result)?;
        info!("渲染完成，共 {} 个目标", result.len());
      }
      FrameOutcome::EngineUnavailable | FrameOutcome::Dropped(_) => {
        stats.failed = 1;
        warn!("本帧没有可渲染的结果");
      }
    }

    Ok(stats)
  }
}

/// 帧源线程只负责放入最新帧，调用线程作为唯一的工作者持有引擎并处理帧，
/// 渲染线程按请求绘制最新快照
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: bool,
  stop: Arc<AtomicBool>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后停止读取帧
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  /// 停止标志，置位后帧源不再提交新帧
  pub fn stop_handle(&self) -> Arc<AtomicBool> {
    self.stop.clone()
  }
}

impl<F, I, M, O> Task<I, M, O> for ContinuousTask
where
  F: SensorFrame + 'static,
  I: Iterator<Item = F> + Send + 'static,
  M: Model<Input = RgbNhwcFrame, Output = Vec<f32>>,
  M::Error: Display,
  O: Render<DetectResult> + Send + 'static,
  O::Error: Display,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: DetectionPipeline<M>, output: O) -> Result<TaskStats, Self::Error> {
    info!("开始任务...");
    let stop = self.stop;
    if self.interrupt {
      let stop = stop.clone();
      if let Err(e) = ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        stop.store(true, Ordering::SeqCst);
      }) {
        warn!("无法设置 Ctrl-C 处理器: {}", e);
      }
    }

    let (overlay, render_loop) = Overlay::new(output);
    let render = render_loop.spawn()?;

    let slot: Arc<LatestSlot<FrameGuard<F>>> = Arc::new(LatestSlot::default());
    let stats = Arc::new(StatsCounter::default());

    let source = {
      let slot = CloseOnDrop(slot.clone());
      let stats = stats.clone();
      let frame_number = self.frame_number;
      thread::Builder::new()
        .name("menpai-source".into())
        .spawn(move || {
          for frame in input {
            // 已取出的帧先交给守卫，停止时也会释放
            let frame = FrameGuard::new(frame);
            let submitted = stats.submitted.fetch_add(1, Ordering::Relaxed) + 1;
            if stop.load(Ordering::SeqCst) {
              warn!("中断信号接收，停止读取帧，第 {} 帧未处理", frame.index());
              stats.dropped.fetch_add(1, Ordering::Relaxed);
              break;
            }
            if let Some(stale) = slot.0.offer(frame) {
              debug!("第 {} 帧尚未处理即被替换", stale.index());
              stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
            if frame_number.is_some_and(|n| submitted >= n) {
              info!("达到指定帧数 {}, 停止读取帧", submitted);
              break;
            }
          }
          // 槽在此关闭，最后一帧仍留给工作循环
          drop(slot);
          debug!("帧源线程退出");
        })?
    };

    // 当前线程即唯一的工作者，引擎不离开此线程
    while let Some(frame) = slot.take() {
      let index = frame.index();
      let now = Instant::now();
      let outcome = pipeline.process(frame, overlay.surface_size());
      stats.record(&outcome);
      if let FrameOutcome::Detected(result) = outcome {
        debug!("第 {} 帧处理完成，耗时: {:.2?}", index, now.elapsed());
        overlay.publish(result);
        if !overlay.request_redraw() {
          warn!("渲染线程已退出");
        }
      }
    }

    if source.join().is_err() {
      warn!("帧源线程异常退出");
    }
    drop(overlay);
    match render.join() {
      Ok(rendered) => info!("共渲染 {} 次", rendered),
      Err(_) => warn!("渲染线程异常退出"),
    }

    let stats = stats.snapshot();
    info!(
      "任务完成: 提交 {} 帧, 处理 {} 帧, 丢弃 {} 帧, 失败 {} 帧",
      stats.submitted, stats.processed, stats.dropped, stats.failed
    );
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread, time::Duration};

  use super::*;

  #[test]
  fn offer_displaces_pending_item() {
    let slot = LatestSlot::default();
    assert_eq!(slot.offer(1), None);
    assert_eq!(slot.offer(2), Some(1));
    assert_eq!(slot.take(), Some(2));
  }

  #[test]
  fn pending_item_survives_close() {
    let slot = LatestSlot::default();
    slot.offer("last");
    slot.close();
    assert_eq!(slot.take(), Some("last"));
    assert_eq!(slot.take(), None);
    assert_eq!(slot.offer("late"), Some("late"));
  }

  #[test]
  fn take_blocks_until_offer() {
    let slot = Arc::new(LatestSlot::default());
    let consumer = {
      let slot = slot.clone();
      thread::spawn(move || slot.take())
    };
    thread::sleep(Duration::from_millis(20));
    slot.offer(7u32);
    assert_eq!(consumer.join().unwrap(), Some(7));
  }

  #[test]
  fn close_wakes_waiting_consumer() {
    let slot: Arc<LatestSlot<u32>> = Arc::new(LatestSlot::default());
    let consumer = {
      let slot = slot.clone();
      thread::spawn(move || slot.take())
    };
    thread::sleep(Duration::from_millis(20));
    slot.close();
    assert_eq!(consumer.join().unwrap(), None);
  }
}
