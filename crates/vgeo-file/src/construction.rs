//! JSON 构造文件
//!
//! 顶层对象包含四个数组：
//!
//! ```json
//! {
//!   "points":        [{ "x": 0.0, "y": 0.0, "label": "P1" }],
//!   "lines":         [{ "a": 0, "b": 1, "label": "L1" },
//!                     { "custom": true, "customAx": 0.0, "customAy": 0.0,
//!                       "customBx": 1.0, "customBy": 1.0, "label": "L2" }],
//!   "extendedLines": [{ "ax": -5.0, "ay": 0.0, "bx": 5.0, "by": 0.0, "label": "E1" }],
//!   "circles":       [{ "x": 0.0, "y": 0.0, "r": 2.0, "label": "C1" }]
//! }
//! ```
//!
//! 读取是宽松的：无法解析的数字按 0 处理，非对象条目被跳过，
//! 悬空或重复的线段、半径非正的圆在构建模型时被丢弃。

use crate::error::FileError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use vgeo_core::config::EngineConfig;
use vgeo_core::entity::{CircleEntry, ExtendedLine, Line, LineEnds, PointEntry};
use vgeo_core::geometry::Circle;
use vgeo_core::math::Point2;
use vgeo_core::model::{Construction, ConstructionParts};

#[derive(Debug, Serialize)]
struct PointRecord<'a> {
    x: f64,
    y: f64,
    label: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum LineRecord<'a> {
    Indexed {
        a: usize,
        b: usize,
        label: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Custom {
        custom: bool,
        custom_ax: f64,
        custom_ay: f64,
        custom_bx: f64,
        custom_by: f64,
        label: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct ExtendedLineRecord<'a> {
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct CircleRecord<'a> {
    x: f64,
    y: f64,
    r: f64,
    label: &'a str,
}

/// 可序列化的文件内容
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileContent<'a> {
    points: Vec<PointRecord<'a>>,
    lines: Vec<LineRecord<'a>>,
    extended_lines: Vec<ExtendedLineRecord<'a>>,
    circles: Vec<CircleRecord<'a>>,
}

impl<'a> FileContent<'a> {
    fn from_model(model: &'a Construction) -> Self {
        Self {
            points: model
                .points()
                .iter()
                .map(|p| PointRecord {
                    x: p.position.x,
                    y: p.position.y,
                    label: &p.label,
                })
                .collect(),
            lines: model
                .lines()
                .iter()
                .map(|line| match line.ends {
                    LineEnds::Indexed { a, b } => LineRecord::Indexed {
                        a,
                        b,
                        label: &line.label,
                    },
                    LineEnds::Literal { start, end } => LineRecord::Custom {
                        custom: true,
                        custom_ax: start.x,
                        custom_ay: start.y,
                        custom_bx: end.x,
                        custom_by: end.y,
                        label: &line.label,
                    },
                })
                .collect(),
            extended_lines: model
                .extended_lines()
                .iter()
                .map(|l| ExtendedLineRecord {
                    ax: l.start.x,
                    ay: l.start.y,
                    bx: l.end.x,
                    by: l.end.y,
                    label: &l.label,
                })
                .collect(),
            circles: model
                .circles()
                .iter()
                .map(|c| CircleRecord {
                    x: c.circle.center.x,
                    y: c.circle.center.y,
                    r: c.circle.radius,
                    label: &c.label,
                })
                .collect(),
        }
    }
}

/// 序列化为缩进的 JSON 文本
pub fn to_json(model: &Construction) -> Result<String, FileError> {
    Ok(serde_json::to_string_pretty(&FileContent::from_model(model))?)
}

/// 从 JSON 文本构建模型；顶层不是对象时失败
pub fn from_json(text: &str, config: &EngineConfig) -> Result<Construction, FileError> {
    let root: Value = serde_json::from_str(text)?;
    let root = root
        .as_object()
        .ok_or_else(|| FileError::InvalidFormat("top-level value is not an object".to_string()))?;

    let mut parts = ConstructionParts::default();

    for obj in records(root, "points") {
        parts.points.push(PointEntry {
            position: Point2::new(number(obj, "x"), number(obj, "y")),
            label: label(obj),
        });
    }

    for obj in records(root, "lines") {
        let custom = obj.get("custom").and_then(Value::as_bool).unwrap_or(false);
        let ends = if custom {
            LineEnds::Literal {
                start: Point2::new(number(obj, "customAx"), number(obj, "customAy")),
                end: Point2::new(number(obj, "customBx"), number(obj, "customBy")),
            }
        } else {
            match (index(obj, "a"), index(obj, "b")) {
                (Some(a), Some(b)) => LineEnds::Indexed { a, b },
                _ => {
                    tracing::warn!("Skipping line without valid point indices");
                    continue;
                }
            }
        };
        parts.lines.push(Line {
            ends,
            label: label(obj),
        });
    }

    for obj in records(root, "extendedLines") {
        parts.extended_lines.push(ExtendedLine {
            start: Point2::new(number(obj, "ax"), number(obj, "ay")),
            end: Point2::new(number(obj, "bx"), number(obj, "by")),
            label: label(obj),
        });
    }

    for obj in records(root, "circles") {
        parts.circles.push(CircleEntry {
            circle: Circle::new(
                Point2::new(number(obj, "x"), number(obj, "y")),
                number(obj, "r"),
            ),
            label: label(obj),
        });
    }

    Ok(Construction::from_parts(config.clone(), parts))
}

/// 数组中的对象条目；缺失的数组视为空，非对象条目被跳过
fn records<'a>(root: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    root.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn number(obj: &Map<String, Value>, key: &str) -> f64 {
    let value = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite()).unwrap_or(0.0)
}

fn index(obj: &Map<String, Value>, key: &str) -> Option<usize> {
    match obj.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn label(obj: &Map<String, Value>) -> String {
    obj.get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// 保存模型到文件，自动创建父目录并覆盖已有文件
pub fn save(model: &Construction, path: &Path) -> Result<(), FileError> {
    let json = to_json(model)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;

    tracing::info!(
        "Saved {} points, {} lines, {} extended lines, {} circles to {}",
        model.points().len(),
        model.lines().len(),
        model.extended_lines().len(),
        model.circles().len(),
        path.display()
    );

    Ok(())
}

/// 从文件加载模型
pub fn load(path: &Path, config: &EngineConfig) -> Result<Construction, FileError> {
    let text = fs::read_to_string(path)?;
    let model = from_json(&text, config)?;

    tracing::info!(
        "Loaded {} points, {} lines, {} extended lines, {} circles from {}",
        model.points().len(),
        model.lines().len(),
        model.extended_lines().len(),
        model.circles().len(),
        path.display()
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgeo_core::entity::ObjectRef;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn sample_model() -> Construction {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), Some("A"), false).unwrap();
        model.add_point(p(3.0, 4.0), None, false).unwrap();
        model.add_line(0, 1, None).unwrap();
        model.add_literal_line(p(-1.0, 2.0), p(2.0, -1.0), Some("free")).unwrap();
        model.add_extended_line(p(-5.0, 0.0), p(5.0, 0.0), None).unwrap();
        model.add_circle(p(1.0, 1.0), 2.5, Some("c")).unwrap();
        model
    }

    #[test]
    fn test_json_layout() {
        let json = to_json(&sample_model()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["points"][0]["label"], "A");
        assert_eq!(value["lines"][0]["a"], 0);
        assert_eq!(value["lines"][0]["b"], 1);
        assert_eq!(value["lines"][1]["custom"], true);
        assert_eq!(value["lines"][1]["customBx"], 2.0);
        assert_eq!(value["extendedLines"][0]["ax"], -5.0);
        assert_eq!(value["circles"][0]["r"], 2.5);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("model.json");

        let model = sample_model();
        save(&model, &path).unwrap();
        let loaded = load(&path, &EngineConfig::default()).unwrap();

        assert_eq!(loaded.to_parts(), model.to_parts());
        assert!(loaded.selection().is_empty());
    }

    #[test]
    fn test_empty_labels_survive_reload() {
        let mut model = sample_model();
        for obj in [
            ObjectRef::Point(1),
            ObjectRef::Line(0),
            ObjectRef::Line(1),
            ObjectRef::ExtendedLine(0),
            ObjectRef::Circle(0),
        ] {
            model.select(obj).unwrap();
            model.set_label("").unwrap();
        }

        let json = to_json(&model).unwrap();
        let loaded = from_json(&json, &EngineConfig::default()).unwrap();

        assert_eq!(loaded.label(ObjectRef::Point(0)), Some("A"));
        assert_eq!(loaded.label(ObjectRef::Point(1)), Some(""));
        assert_eq!(loaded.label(ObjectRef::Line(0)), Some(""));
        assert_eq!(loaded.label(ObjectRef::Line(1)), Some(""));
        assert_eq!(loaded.label(ObjectRef::ExtendedLine(0)), Some(""));
        assert_eq!(loaded.label(ObjectRef::Circle(0)), Some(""));
    }

    #[test]
    fn test_save_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        save(&sample_model(), &path).unwrap();
        save(&Construction::new(), &path).unwrap();

        let loaded = load(&path, &EngineConfig::default()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_lenient_loading() {
        let text = r#"{
            "points": [
                { "x": 1, "y": "2.5", "label": "A" },
                { "x": "oops", "y": 0 },
                42,
                { "x": 1, "y": 2.5, "label": "dup" }
            ],
            "lines": [
                { "a": 0, "b": 1 },
                { "a": -1, "b": 0 },
                { "a": 0, "b": 5 },
                { "custom": true, "customAx": 0, "customAy": 0, "customBx": 1, "customBy": 1 }
            ],
            "circles": [
                { "x": 0, "y": 0, "r": 0 },
                { "x": 0, "y": 0, "r": -2 },
                { "x": 0, "y": 0, "r": 3, "label": "big" }
            ]
        }"#;

        let model = from_json(text, &EngineConfig::default()).unwrap();
        assert_eq!(model.points().len(), 2);
        assert_eq!(model.points()[0].position, p(1.0, 2.5));
        assert_eq!(model.points()[1].position, p(0.0, 0.0));
        assert_eq!(model.points()[1].label, "");
        assert_eq!(model.lines().len(), 2);
        assert!(model.extended_lines().is_empty());
        assert_eq!(model.circles().len(), 1);
        assert_eq!(model.label(ObjectRef::Circle(0)), Some("big"));
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        assert!(matches!(
            from_json("[1, 2, 3]", &EngineConfig::default()),
            Err(FileError::InvalidFormat(_))
        ));
        assert!(matches!(
            from_json("not json", &EngineConfig::default()),
            Err(FileError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("absent.json"), &EngineConfig::default());
        assert!(matches!(result, Err(FileError::Io(_))));
    }
}
