//! 会话
//!
//! 界面层的唯一入口：每个用户意图对应一个方法，成功后在录制状态下追加一条自包含的宏命令，
//! 并向订阅者广播变化事件。宏回放经 [`Session::execute`] 执行，不会被再次录制。

use crate::config::EngineConfig;
use crate::entity::{ObjectKind, ObjectRef};
use crate::error::ConstructionError;
use crate::macros::{
    CancelToken, MacroCommand, MacroPlayer, MacroRecorder, NormalSpec, ReplayReport, SelectionSpec,
};
use crate::math::Point2;
use crate::model::{Construction, DeleteSummary};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// 构造数据的持久化接口
pub trait ConstructionStore {
    /// 读取构造文件，使用 `config` 构建模型
    fn load(&self, path: &Path, config: &EngineConfig) -> Result<Construction, ConstructionError>;

    /// 写出完整模型
    fn save(&self, path: &Path, model: &Construction) -> Result<(), ConstructionError>;
}

/// 会话变化事件
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// 几何内容变化
    ModelChanged,
    SelectionChanged,
    Loaded(PathBuf),
    Saved(PathBuf),
    RecordingChanged(bool),
    /// 宏回放执行了第 `index` 条命令（从 0 开始）
    ReplayStep { index: usize, total: usize },
}

pub struct Session {
    model: Construction,
    recorder: MacroRecorder,
    store: Option<Box<dyn ConstructionStore + Send>>,
    subscribers: Vec<mpsc::UnboundedSender<ChangeEvent>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            model: Construction::with_config(config),
            recorder: MacroRecorder::new(),
            store: None,
            subscribers: Vec::new(),
        }
    }

    pub fn with_store(mut self, store: impl ConstructionStore + Send + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn model(&self) -> &Construction {
        &self.model
    }

    pub fn config(&self) -> &EngineConfig {
        self.model.config()
    }

    /// 订阅变化事件
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ChangeEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.push(sender);
        receiver
    }

    fn notify(&mut self, event: ChangeEvent) {
        // 接收端已关闭的订阅者被移除
        self.subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    fn record(&mut self, command: MacroCommand) {
        self.recorder.record(command);
    }

    // ========== 录制 ==========

    pub fn start_recording(&mut self) {
        self.recorder.start();
        self.notify(ChangeEvent::RecordingChanged(true));
    }

    pub fn stop_recording(&mut self) {
        if self.recorder.is_recording() {
            self.recorder.stop();
            self.notify(ChangeEvent::RecordingChanged(false));
        }
    }

    pub fn toggle_recording(&mut self) -> bool {
        let recording = self.recorder.toggle();
        self.notify(ChangeEvent::RecordingChanged(recording));
        recording
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorded(&self) -> &[MacroCommand] {
        self.recorder.commands()
    }

    /// 用外部命令列表（例如宏文件）替换已录制的命令
    pub fn set_recorded(&mut self, commands: Vec<MacroCommand>) {
        self.recorder.replace(commands);
    }

    // ========== 选择（不录制） ==========

    pub fn select(&mut self, obj: ObjectRef) -> Result<(), ConstructionError> {
        self.model.select(obj)?;
        self.notify(ChangeEvent::SelectionChanged);
        Ok(())
    }

    pub fn toggle_selection(&mut self, obj: ObjectRef) -> Result<bool, ConstructionError> {
        let selected = self.model.toggle_selection(obj)?;
        self.notify(ChangeEvent::SelectionChanged);
        Ok(selected)
    }

    pub fn clear_selection(&mut self) {
        self.model.clear_selection();
        self.notify(ChangeEvent::SelectionChanged);
    }

    /// 在模型坐标处点击：命中对象时普通选择或追加选择，未命中时普通点击清空选择
    pub fn click(
        &mut self,
        position: Point2,
        tolerance: f64,
        additive: bool,
    ) -> Result<Option<ObjectRef>, ConstructionError> {
        match self.model.hit_test(position, tolerance) {
            Some(obj) if additive => {
                self.toggle_selection(obj)?;
                Ok(Some(obj))
            }
            Some(obj) => {
                self.select(obj)?;
                Ok(Some(obj))
            }
            None => {
                if !additive {
                    self.clear_selection();
                }
                Ok(None)
            }
        }
    }

    // ========== 用户意图 ==========

    /// 添加点并追加到点选择中
    pub fn add_point(
        &mut self,
        position: Point2,
        label: Option<&str>,
    ) -> Result<usize, ConstructionError> {
        // 空名称按未命名处理
        let label = label.filter(|l| !l.is_empty());
        let index = self.model.add_point(position, label, true)?;
        self.record(MacroCommand::AddPoint {
            position,
            label: label.map(str::to_string),
        });
        self.notify(ChangeEvent::ModelChanged);
        Ok(index)
    }

    /// 连接最先选中的两个点
    pub fn connect_selected(&mut self) -> Result<usize, ConstructionError> {
        let index = self.model.connect_selected()?;
        let ends = self.model.line_endpoints(index);
        self.record(MacroCommand::AddLine(ends));
        self.notify(ChangeEvent::ModelChanged);
        Ok(index)
    }

    pub fn extend_selected_lines(&mut self) -> Result<Vec<usize>, ConstructionError> {
        let spec = SelectionSpec::capture(&self.model);
        let created = self.model.extend_selected_lines()?;
        self.record(MacroCommand::ExtendLines(Some(spec)));
        self.notify(ChangeEvent::ModelChanged);
        Ok(created)
    }

    /// 以选中的两个点作圆（圆心、圆上一点）
    pub fn add_circle(&mut self) -> Result<usize, ConstructionError> {
        let ends = match self.model.selection().ordered_points() {
            [center, edge] => self
                .model
                .point_position(*center)
                .zip(self.model.point_position(*edge)),
            _ => None,
        };
        let index = self.model.add_circle_from_selection()?;
        self.record(MacroCommand::AddCircle(ends));
        self.notify(ChangeEvent::ModelChanged);
        Ok(index)
    }

    pub fn delete_selected(&mut self) -> Result<DeleteSummary, ConstructionError> {
        let spec = SelectionSpec::capture(&self.model);
        let summary = self.model.delete_selected()?;
        self.record(MacroCommand::DeleteSelected(Some(spec)));
        self.notify(ChangeEvent::ModelChanged);
        Ok(summary)
    }

    /// 清空模型；模型原本为空时返回 `false`，不录制也不广播
    pub fn delete_all(&mut self) -> bool {
        if !self.model.delete_all() {
            return false;
        }
        self.record(MacroCommand::DeleteAll);
        self.notify(ChangeEvent::ModelChanged);
        true
    }

    /// 过选中的点作选中直线的法线
    pub fn add_normal(&mut self) -> Result<usize, ConstructionError> {
        let spec = self.normal_spec();
        let index = self.model.add_normal_from_selection()?;
        self.record(MacroCommand::AddNormal(spec));
        self.notify(ChangeEvent::ModelChanged);
        Ok(index)
    }

    fn normal_spec(&self) -> Option<NormalSpec> {
        let (first, second) = self.model.selection().pair()?;
        let (line, point) = match (first, second) {
            (ObjectRef::Point(p), line) | (line, ObjectRef::Point(p)) => (line, p),
            _ => return None,
        };
        let (a, b) = match line {
            ObjectRef::Line(i) => self.model.line_endpoints(i)?,
            ObjectRef::ExtendedLine(i) => self.model.extended_line_endpoints(i)?,
            _ => return None,
        };
        Some(NormalSpec {
            a,
            b,
            through: self.model.point_position(point)?,
        })
    }

    pub fn recompute_intersections(&mut self) -> Result<Vec<usize>, ConstructionError> {
        let spec = SelectionSpec::capture(&self.model);
        let created = self.model.recompute_intersections()?;
        self.record(MacroCommand::Intersections(Some(spec)));
        self.notify(ChangeEvent::ModelChanged);
        Ok(created)
    }

    pub fn set_label(&mut self, text: &str) -> Result<ObjectRef, ConstructionError> {
        let spec = SelectionSpec::capture(&self.model);
        let target = self.model.set_label(text)?;
        self.record(MacroCommand::SetLabel {
            selection: Some(spec),
            label: text.to_string(),
        });
        self.notify(ChangeEvent::ModelChanged);
        Ok(target)
    }

    /// 读取构造文件替换当前模型；失败时模型不变
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), ConstructionError> {
        let path = path.as_ref();
        self.open_file(path)?;
        self.record(MacroCommand::Open(path.to_path_buf()));
        Ok(())
    }

    fn open_file(&mut self, path: &Path) -> Result<(), ConstructionError> {
        let store = self.store.as_ref().ok_or_else(no_store)?;
        let loaded = store.load(path, self.model.config())?;
        self.model.replace_with(loaded);
        info!(
            "Opened {} ({} points)",
            path.display(),
            self.model.point_count()
        );
        self.notify(ChangeEvent::Loaded(path.to_path_buf()));
        Ok(())
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), ConstructionError> {
        let path = path.as_ref();
        self.save_file(path)?;
        self.record(MacroCommand::Save(path.to_path_buf()));
        Ok(())
    }

    fn save_file(&mut self, path: &Path) -> Result<(), ConstructionError> {
        let store = self.store.as_ref().ok_or_else(no_store)?;
        store.save(path, &self.model)?;
        self.notify(ChangeEvent::Saved(path.to_path_buf()));
        Ok(())
    }

    // ========== 宏回放 ==========

    /// 执行一条宏命令（不录制）
    ///
    /// 带坐标的命令先按坐标恢复选择，任何一个坐标无法解析时不修改几何。
    pub fn execute(&mut self, command: &MacroCommand) -> Result<(), ConstructionError> {
        let tolerance = self.model.config().match_tolerance;
        match command {
            MacroCommand::AddPoint { position, label } => {
                self.model.add_point(*position, label.as_deref(), true)?;
            }
            MacroCommand::AddLine(ends) => {
                if let Some((a, b)) = ends {
                    // 缺失的端点先创建
                    let mut indices = Vec::with_capacity(2);
                    for p in [*a, *b] {
                        let index = match self.model.find_point(p, tolerance) {
                            Some(index) => index,
                            None => self.model.add_point(p, None, false)?,
                        };
                        indices.push(index);
                    }
                    self.model.clear_selection();
                    for index in indices {
                        self.model.add_to_selection(ObjectRef::Point(index))?;
                    }
                }
                self.model.connect_selected()?;
            }
            MacroCommand::AddCircle(ends) => {
                if let Some((center, edge)) = ends {
                    let spec = SelectionSpec {
                        points: vec![*center, *edge],
                        ..SelectionSpec::default()
                    };
                    spec.apply(&mut self.model)?;
                }
                self.model.add_circle_from_selection()?;
            }
            MacroCommand::ExtendLines(spec) => {
                self.apply_selection(spec)?;
                self.model.extend_selected_lines()?;
            }
            MacroCommand::AddNormal(normal) => {
                if let Some(normal) = normal {
                    let line = self
                        .model
                        .find_line(normal.a, normal.b, tolerance)
                        .map(ObjectRef::Line)
                        .or_else(|| {
                            self.model
                                .find_extended_line(normal.a, normal.b, tolerance)
                                .map(ObjectRef::ExtendedLine)
                        })
                        .ok_or(ConstructionError::Unresolved {
                            kind: ObjectKind::Line,
                        })?;
                    let point = self
                        .model
                        .find_point(normal.through, tolerance)
                        .ok_or(ConstructionError::Unresolved {
                            kind: ObjectKind::Point,
                        })?;
                    self.model.clear_selection();
                    self.model.add_to_selection(line)?;
                    self.model.add_to_selection(ObjectRef::Point(point))?;
                }
                self.model.add_normal_from_selection()?;
            }
            MacroCommand::Intersections(spec) => {
                self.apply_selection(spec)?;
                self.model.recompute_intersections()?;
            }
            MacroCommand::SetLabel { selection, label } => {
                self.apply_selection(selection)?;
                self.model.set_label(label)?;
            }
            MacroCommand::DeleteSelected(spec) => {
                self.apply_selection(spec)?;
                self.model.delete_selected()?;
            }
            MacroCommand::DeleteAll => {
                self.model.delete_all();
            }
            MacroCommand::Open(path) => self.open_file(path)?,
            MacroCommand::Save(path) => self.save_file(path)?,
        }

        debug!("Executed {}", command.name());
        self.notify(ChangeEvent::ModelChanged);
        Ok(())
    }

    fn apply_selection(&mut self, spec: &Option<SelectionSpec>) -> Result<(), ConstructionError> {
        match spec {
            Some(spec) => spec.apply(&mut self.model),
            None => Ok(()),
        }
    }

    /// 回放宏：先停止录制，回放过程中的操作不会被录制
    pub async fn run_macro(
        &mut self,
        commands: Vec<MacroCommand>,
        cancel: &CancelToken,
    ) -> ReplayReport {
        self.stop_recording();
        let mut player = MacroPlayer::new(commands, self.model.config().replay_delay());
        info!("Running macro with {} commands", player.len());
        player.run(self, cancel).await
    }

    /// 回放已录制（或已加载）的命令
    pub async fn run_recorded(&mut self, cancel: &CancelToken) -> ReplayReport {
        let commands = self.recorder.commands().to_vec();
        self.run_macro(commands, cancel).await
    }

    pub(crate) fn notify_replay_step(&mut self, index: usize, total: usize) {
        self.notify(ChangeEvent::ReplayStep { index, total });
    }
}

fn no_store() -> ConstructionError {
    ConstructionError::Storage("no construction store configured".to_string())
}
