// 该文件是 Menpai （门牌） 项目的一部分。
// src/output/overlay.rs - 结果快照交接与渲染线程
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
    Arc, Mutex, MutexGuard,
    mpsc::{self, Receiver, Sender},
  },
  thread::{self, JoinHandle},
};

use tracing::{debug, info, warn};

use crate::{model::DetectResult, output::Render, transform::SurfaceSize};

struct Shared {
  snapshot: Option<DetectResult>,
  surface: SurfaceSize,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
  shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 工作线程一侧的句柄：先 `publish` 快照，再 `request_redraw`
#[derive(Clone)]
pub struct Overlay {
  shared: Arc<Mutex<Shared>>,
  redraw: Sender<()>,
}

impl Overlay {
  /// 创建句柄与对应的渲染循环
  pub fn new<R>(renderer: R) -> (Self, RenderLoop<R>)
  where
    R: Render<DetectResult>,
  {
    let (redraw, requests) = mpsc::channel();
    let shared = Arc::new(Mutex::new(Shared {
      snapshot: None,
      surface: renderer.surface_size(),
    }));

    let overlay = Self {
      shared: shared.clone(),
      redraw,
    };
    let render_loop = RenderLoop {
      shared,
      requests,
      renderer,
    };
    (overlay, render_loop)
  }

  /// 替换当前快照，旧快照直接丢弃
  pub fn publish(&self, result: DetectResult) {
    lock(&self.shared).snapshot = Some(result);
  }

  /// 渲染线程已退出时返回 `false`
  pub fn request_redraw(&self) -> bool {
    self.redraw.send(()).is_ok()
  }

  /// 每帧映射时读取，表面尺寸变化后立即生效
  pub fn surface_size(&self) -> SurfaceSize {
    lock(&self.shared).surface
  }

  pub fn resize(&self, surface: SurfaceSize) {
    info!("显示表面尺寸变为 {}x{}", surface.width, surface.height);
    lock(&self.shared).surface = surface;
  }

  pub fn snapshot(&self) -> Option<DetectResult> {
    lock(&self.shared).snapshot.clone()
  }
}

/// 渲染线程：每个重绘请求渲染一次最新快照，积压的请求合并为一次
pub struct RenderLoop<R> {
  shared: Arc<Mutex<Shared>>,
  requests: Receiver<()>,
  renderer: R,
}

impl<R> RenderLoop<R>
where
  R: Render<DetectResult>,
  R::Error: Display,
{
  /// 所有 `Overlay` 句柄被丢弃后返回，结果为渲染次数
  pub fn run(self) -> usize {
    let mut rendered = 0;
    let mut last_frame = None;

    while self.requests.recv().is_ok() {
      let coalesced = self.requests.try_iter().count();
      if coalesced > 0 {
        debug!("合并 {} 个重绘请求", coalesced);
      }

      let Some(snapshot) = lock(&self.shared).snapshot.clone() else {
        continue;
      };
      if last_frame == Some(snapshot.frame_index) {
        continue;
      }

      match self.renderer.render_result(&snapshot) {
        Ok(()) => {
          rendered += 1;
          last_frame = Some(snapshot.frame_index);
        }
        Err(e) => warn!("渲染第 {} 帧失败: {}", snapshot.frame_index, e),
      }
    }

    info!("渲染线程退出，共渲染 {} 次", rendered);
    rendered
  }
}

impl<R> RenderLoop<R>
where
  R: Render<DetectResult> + Send + 'static,
  R::Error: Display,
{
  pub fn spawn(self) -> std::io::Result<JoinHandle<usize>> {
    thread::Builder::new()
      .name("menpai-render".into())
      .spawn(move || self.run())
  }
}
