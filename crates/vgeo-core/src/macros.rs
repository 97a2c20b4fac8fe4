//! 宏命令录制与回放
//!
//! 每个用户意图录制为一行自包含的文本命令，只携带坐标字面值，不携带索引，
//! 因此中间的删除和索引压缩不会使命令失效。
//!
//! # 文本格式
//!
//! ```text
//! addPoint:x,y[:label]
//! addLine[:ax,ay|bx,by]
//! addCircle[:cx,cy|ex,ey]
//! extendLines[;fields]
//! addNormal[:ax,ay|bx,by;px,py]
//! intersections[;fields]
//! setLabel[;fields]:label
//! deleteSelected[;fields]
//! deleteAll
//! open:path
//! save:path
//! ```
//!
//! 选择字段以 `;` 分隔：`P=x,y|x,y`、`L=ax,ay|bx,by#…`、`E=…`、`C=cx,cy,r#…`。
//! 不带选择字段的命令作用于当前选择。

use crate::entity::ObjectRef;
use crate::error::{ConstructionError, MacroParseError};
use crate::math::Point2;
use crate::model::Construction;
use crate::session::Session;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 坐标输出精度（小数位）
const COORD_PRECISION: usize = 8;

fn fmt_point(p: &Point2) -> String {
    format!("{:.*},{:.*}", COORD_PRECISION, p.x, COORD_PRECISION, p.y)
}

fn fmt_pair(a: &Point2, b: &Point2) -> String {
    format!("{}|{}", fmt_point(a), fmt_point(b))
}

fn parse_number(text: &str) -> Result<f64, MacroParseError> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(MacroParseError::InvalidNumber(text.to_string())),
    }
}

fn parse_point(text: &str) -> Result<Point2, MacroParseError> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| MacroParseError::InvalidNumber(text.to_string()))?;
    Ok(Point2::new(parse_number(x)?, parse_number(y)?))
}

fn parse_pair(text: &str) -> Result<(Point2, Point2), MacroParseError> {
    let (a, b) = text
        .split_once('|')
        .ok_or_else(|| MacroParseError::InvalidNumber(text.to_string()))?;
    Ok((parse_point(a)?, parse_point(b)?))
}

// ========== 选择字面值 ==========

/// 以坐标字面值描述的一组选择
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSpec {
    /// 按选择顺序
    pub points: Vec<Point2>,
    pub lines: Vec<(Point2, Point2)>,
    pub extended_lines: Vec<(Point2, Point2)>,
    /// 圆心与半径
    pub circles: Vec<(Point2, f64)>,
}

impl SelectionSpec {
    /// 记录模型当前的选择
    pub fn capture(model: &Construction) -> Self {
        let selection = model.selection();
        Self {
            points: selection
                .ordered_points()
                .iter()
                .filter_map(|&i| model.point_position(i))
                .collect(),
            lines: selection
                .lines()
                .filter_map(|i| model.line_endpoints(i))
                .collect(),
            extended_lines: selection
                .extended_lines()
                .filter_map(|i| model.extended_line_endpoints(i))
                .collect(),
            circles: selection
                .circles()
                .filter_map(|i| model.circles().get(i))
                .map(|c| (c.circle.center, c.circle.radius))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            && self.lines.is_empty()
            && self.extended_lines.is_empty()
            && self.circles.is_empty()
    }

    /// 把字面值解析为模型中的对象，任何一个找不到即失败
    pub fn resolve(
        &self,
        model: &Construction,
        tolerance: f64,
    ) -> Result<Vec<ObjectRef>, ConstructionError> {
        use crate::entity::ObjectKind;

        let mut objects = Vec::new();
        for p in &self.points {
            let index = model
                .find_point(*p, tolerance)
                .ok_or(ConstructionError::Unresolved { kind: ObjectKind::Point })?;
            objects.push(ObjectRef::Point(index));
        }
        for (a, b) in &self.lines {
            let index = model
                .find_line(*a, *b, tolerance)
                .ok_or(ConstructionError::Unresolved { kind: ObjectKind::Line })?;
            objects.push(ObjectRef::Line(index));
        }
        for (a, b) in &self.extended_lines {
            let index = model
                .find_extended_line(*a, *b, tolerance)
                .ok_or(ConstructionError::Unresolved { kind: ObjectKind::ExtendedLine })?;
            objects.push(ObjectRef::ExtendedLine(index));
        }
        for (center, radius) in &self.circles {
            let index = model
                .find_circle(*center, *radius, tolerance)
                .ok_or(ConstructionError::Unresolved { kind: ObjectKind::Circle })?;
            objects.push(ObjectRef::Circle(index));
        }
        Ok(objects)
    }

    /// 用字面值替换模型的当前选择；解析失败时选择不变
    pub fn apply(&self, model: &mut Construction) -> Result<(), ConstructionError> {
        let objects = self.resolve(model, model.config().match_tolerance)?;
        model.clear_selection();
        for obj in objects {
            model.add_to_selection(obj)?;
        }
        Ok(())
    }

    fn parse(text: &str) -> Result<Self, MacroParseError> {
        let mut spec = SelectionSpec::default();
        for field in text.split(';').filter(|f| !f.is_empty()) {
            let malformed = || MacroParseError::MalformedPayload {
                command: "selection".to_string(),
                payload: field.to_string(),
            };
            let (key, items) = field.split_once('=').ok_or_else(malformed)?;
            match key {
                "P" => {
                    for item in items.split('|').filter(|s| !s.is_empty()) {
                        spec.points.push(parse_point(item)?);
                    }
                }
                "L" | "E" => {
                    let target = if key == "L" {
                        &mut spec.lines
                    } else {
                        &mut spec.extended_lines
                    };
                    for item in items.split('#').filter(|s| !s.is_empty()) {
                        target.push(parse_pair(item)?);
                    }
                }
                "C" => {
                    for item in items.split('#').filter(|s| !s.is_empty()) {
                        let parts: Vec<&str> = item.split(',').collect();
                        let [x, y, r] = parts.as_slice() else {
                            return Err(malformed());
                        };
                        spec.circles.push((
                            Point2::new(parse_number(x)?, parse_number(y)?),
                            parse_number(r)?,
                        ));
                    }
                }
                _ => return Err(malformed()),
            }
        }
        Ok(spec)
    }
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        if !self.points.is_empty() {
            let items: Vec<_> = self.points.iter().map(fmt_point).collect();
            fields.push(format!("P={}", items.join("|")));
        }
        if !self.lines.is_empty() {
            let items: Vec<_> = self.lines.iter().map(|(a, b)| fmt_pair(a, b)).collect();
            fields.push(format!("L={}", items.join("#")));
        }
        if !self.extended_lines.is_empty() {
            let items: Vec<_> = self
                .extended_lines
                .iter()
                .map(|(a, b)| fmt_pair(a, b))
                .collect();
            fields.push(format!("E={}", items.join("#")));
        }
        if !self.circles.is_empty() {
            let items: Vec<_> = self
                .circles
                .iter()
                .map(|(c, r)| format!("{},{:.*}", fmt_point(c), COORD_PRECISION, r))
                .collect();
            fields.push(format!("C={}", items.join("#")));
        }
        f.write_str(&fields.join(";"))
    }
}

fn write_with_selection(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    spec: &Option<SelectionSpec>,
) -> fmt::Result {
    match spec {
        Some(spec) => write!(f, "{};{}", name, spec),
        None => f.write_str(name),
    }
}

// ========== 命令 ==========

/// 法线命令：原直线的两个端点与经过的点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalSpec {
    pub a: Point2,
    pub b: Point2,
    pub through: Point2,
}

/// 一条宏命令
///
/// `Option` 为 `None` 的字段表示旧格式：作用于当前选择。
#[derive(Debug, Clone, PartialEq)]
pub enum MacroCommand {
    AddPoint {
        position: Point2,
        label: Option<String>,
    },
    /// 连接两个点（缺失的点会被创建）
    AddLine(Option<(Point2, Point2)>),
    /// 圆心与圆上一点
    AddCircle(Option<(Point2, Point2)>),
    ExtendLines(Option<SelectionSpec>),
    AddNormal(Option<NormalSpec>),
    Intersections(Option<SelectionSpec>),
    SetLabel {
        selection: Option<SelectionSpec>,
        label: String,
    },
    DeleteSelected(Option<SelectionSpec>),
    DeleteAll,
    Open(PathBuf),
    Save(PathBuf),
}

impl MacroCommand {
    pub fn name(&self) -> &'static str {
        match self {
            MacroCommand::AddPoint { .. } => "addPoint",
            MacroCommand::AddLine(_) => "addLine",
            MacroCommand::AddCircle(_) => "addCircle",
            MacroCommand::ExtendLines(_) => "extendLines",
            MacroCommand::AddNormal(_) => "addNormal",
            MacroCommand::Intersections(_) => "intersections",
            MacroCommand::SetLabel { .. } => "setLabel",
            MacroCommand::DeleteSelected(_) => "deleteSelected",
            MacroCommand::DeleteAll => "deleteAll",
            MacroCommand::Open(_) => "open",
            MacroCommand::Save(_) => "save",
        }
    }
}

impl fmt::Display for MacroCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            MacroCommand::AddPoint { position, label } => {
                write!(f, "{}:{}", name, fmt_point(position))?;
                if let Some(label) = label {
                    write!(f, ":{}", label)?;
                }
                Ok(())
            }
            MacroCommand::AddLine(pair) | MacroCommand::AddCircle(pair) => match pair {
                Some((a, b)) => write!(f, "{}:{}", name, fmt_pair(a, b)),
                None => f.write_str(name),
            },
            MacroCommand::AddNormal(normal) => match normal {
                Some(n) => write!(
                    f,
                    "{}:{};{}",
                    name,
                    fmt_pair(&n.a, &n.b),
                    fmt_point(&n.through)
                ),
                None => f.write_str(name),
            },
            MacroCommand::ExtendLines(spec)
            | MacroCommand::Intersections(spec)
            | MacroCommand::DeleteSelected(spec) => write_with_selection(f, name, spec),
            MacroCommand::SetLabel { selection, label } => {
                write_with_selection(f, name, selection)?;
                write!(f, ":{}", label)
            }
            MacroCommand::DeleteAll => f.write_str(name),
            MacroCommand::Open(path) | MacroCommand::Save(path) => {
                write!(f, "{}:{}", name, path.display())
            }
        }
    }
}

impl FromStr for MacroCommand {
    type Err = MacroParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Err(MacroParseError::Empty);
        }

        let name_end = line.find(|c| c == ':' || c == ';').unwrap_or(line.len());
        let (name, rest) = line.split_at(name_end);
        let malformed = || MacroParseError::MalformedPayload {
            command: name.to_string(),
            payload: rest.to_string(),
        };
        // ":payload"
        let payload = || rest.strip_prefix(':').ok_or_else(malformed);
        // "" 或 ";fields"
        let selection = |text: &str| -> Result<Option<SelectionSpec>, MacroParseError> {
            if text.is_empty() {
                Ok(None)
            } else {
                let fields = text.strip_prefix(';').ok_or_else(malformed)?;
                SelectionSpec::parse(fields).map(Some)
            }
        };
        let optional_pair = || -> Result<Option<(Point2, Point2)>, MacroParseError> {
            if rest.is_empty() {
                Ok(None)
            } else {
                parse_pair(payload()?).map(Some)
            }
        };

        let command = match name {
            "addPoint" => {
                let payload = payload()?;
                let (coords, label) = match payload.split_once(':') {
                    Some((coords, label)) => {
                        (coords, (!label.is_empty()).then(|| label.to_string()))
                    }
                    None => (payload, None),
                };
                MacroCommand::AddPoint {
                    position: parse_point(coords)?,
                    label,
                }
            }
            "addLine" => MacroCommand::AddLine(optional_pair()?),
            "addCircle" => MacroCommand::AddCircle(optional_pair()?),
            "addNormal" => {
                if rest.is_empty() {
                    MacroCommand::AddNormal(None)
                } else {
                    let (pair, through) = payload()?.split_once(';').ok_or_else(malformed)?;
                    let (a, b) = parse_pair(pair)?;
                    MacroCommand::AddNormal(Some(NormalSpec {
                        a,
                        b,
                        through: parse_point(through)?,
                    }))
                }
            }
            "extendLines" => MacroCommand::ExtendLines(selection(rest)?),
            "intersections" => MacroCommand::Intersections(selection(rest)?),
            "deleteSelected" => MacroCommand::DeleteSelected(selection(rest)?),
            "setLabel" => {
                let (fields, label) = rest.split_once(':').ok_or_else(malformed)?;
                MacroCommand::SetLabel {
                    selection: selection(fields)?,
                    label: label.to_string(),
                }
            }
            "deleteAll" if rest.is_empty() => MacroCommand::DeleteAll,
            "deleteAll" => return Err(malformed()),
            "open" | "save" => {
                let path = payload()?;
                if path.is_empty() {
                    return Err(malformed());
                }
                if name == "open" {
                    MacroCommand::Open(PathBuf::from(path))
                } else {
                    MacroCommand::Save(PathBuf::from(path))
                }
            }
            _ => return Err(MacroParseError::UnknownCommand(name.to_string())),
        };
        Ok(command)
    }
}

// ========== 录制 ==========

/// 宏录制器
#[derive(Debug, Clone, Default)]
pub struct MacroRecorder {
    recording: bool,
    commands: Vec<MacroCommand>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始录制，丢弃之前的命令
    pub fn start(&mut self) {
        self.commands.clear();
        self.recording = true;
        info!("Macro recording started");
    }

    pub fn stop(&mut self) {
        if self.recording {
            self.recording = false;
            info!("Macro recording stopped ({} commands)", self.commands.len());
        }
    }

    /// 切换录制状态，返回切换后是否在录制
    pub fn toggle(&mut self) -> bool {
        if self.recording {
            self.stop();
        } else {
            self.start();
        }
        self.recording
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// 录制中时追加命令，返回是否追加
    pub fn record(&mut self, command: MacroCommand) -> bool {
        if !self.recording {
            return false;
        }
        debug!("Recorded: {}", command);
        self.commands.push(command);
        true
    }

    pub fn commands(&self) -> &[MacroCommand] {
        &self.commands
    }

    /// 替换命令列表（例如从宏文件加载）
    pub fn replace(&mut self, commands: Vec<MacroCommand>) {
        self.commands = commands;
    }
}

// ========== 回放 ==========

/// 回放取消令牌，可克隆并跨任务共享
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// 等待取消
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// 回放结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub total: usize,
    pub executed: usize,
    /// 失败的命令序号及原因（失败的命令被跳过）
    pub failed: Vec<(usize, ConstructionError)>,
    pub cancelled: bool,
}

/// 宏回放器
///
/// 每次 `step` 完整执行一条命令；`run` 在命令之间等待固定间隔，
/// 只在命令边界响应取消。
#[derive(Debug, Clone)]
pub struct MacroPlayer {
    commands: Vec<MacroCommand>,
    cursor: usize,
    delay: Duration,
}

impl MacroPlayer {
    pub fn new(commands: Vec<MacroCommand>, delay: Duration) -> Self {
        Self {
            commands,
            cursor: 0,
            delay,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.commands.len()
    }

    /// 执行下一条命令；全部执行完时返回 `None`
    pub fn step(&mut self, session: &mut Session) -> Option<Result<(), ConstructionError>> {
        let command = self.commands.get(self.cursor)?;
        self.cursor += 1;
        debug!("Replaying [{}/{}] {}", self.cursor, self.commands.len(), command);
        Some(session.execute(command))
    }

    /// 依次执行剩余命令，命令之间等待 `delay`
    pub async fn run(&mut self, session: &mut Session, cancel: &CancelToken) -> ReplayReport {
        let mut report = ReplayReport {
            total: self.commands.len(),
            ..ReplayReport::default()
        };

        while !self.is_finished() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let index = self.cursor;
            match self.step(session) {
                Some(Ok(())) => report.executed += 1,
                Some(Err(e)) => {
                    warn!("Macro command {} ({}) failed: {}", index + 1, self.commands[index], e);
                    report.failed.push((index, e));
                }
                None => break,
            }
            session.notify_replay_step(index, report.total);

            if !self.is_finished() {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }

        info!(
            "Replay finished: {} executed, {} failed, cancelled: {}",
            report.executed,
            report.failed.len(),
            report.cancelled
        );
        report
    }
}
