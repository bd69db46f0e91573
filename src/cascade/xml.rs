//! Loader for OpenCV cascade XML files.
//!
//! Only the current `opencv-cascade-classifier` layout with
//! `stageType = BOOST` and `featureType = HAAR` is accepted. The legacy
//! `opencv-haar-classifier` layout and tilted features are rejected.
//!
//! ```xml
//! <opencv_storage>
//!   <cascade>
//!     <stageType>BOOST</stageType> <featureType>HAAR</featureType>
//!     <height>24</height> <width>24</width>
//!     <stages>
//!       <_>
//!         <stageThreshold>-1.4</stageThreshold>
//!         <weakClassifiers>
//!           <_>
//!             <internalNodes>0 -1 0 -3.1e-02</internalNodes>
//!             <leafValues>2.08e-01 -8.6e-01</leafValues>
//!           </_>
//!         </weakClassifiers>
//!       </_>
//!     </stages>
//!     <features>
//!       <_> <rects> <_>6 4 12 9 -1.</_> <_>6 7 12 3 3.</_> </rects> </_>
//!     </features>
//!   </cascade>
//! </opencv_storage>
//! ```

use super::{HaarCascade, HaarFeature, Stage, TreeNode, WeakClassifier, WeightedRect};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::str::FromStr;

/// Stored stage thresholds are lowered by this amount to absorb float noise.
const STAGE_THRESHOLD_EPS: f64 = 1e-5;

/// Parse a cascade document. Errors are plain descriptions; the caller
/// attaches the file path.
pub(super) fn parse_cascade(xml: &str) -> Result<HaarCascade, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = RawCascade::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                if let Some(rel) = cascade_relative(&path) {
                    doc.open(&rel);
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                if let Some(rel) = cascade_relative(&path) {
                    doc.text(&rel, &text)?;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    doc.finish()
}

/// Element path below `<opencv_storage><cascade>`, or None outside it.
fn cascade_relative(path: &[String]) -> Option<Vec<&str>> {
    match path {
        [_, cascade, rest @ ..] if cascade == "cascade" => {
            Some(rest.iter().map(String::as_str).collect())
        }
        _ => None,
    }
}

#[derive(Debug, Default)]
struct RawCascade {
    seen_cascade: bool,
    stage_type: Option<String>,
    feature_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    stages: Vec<RawStage>,
    features: Vec<RawFeature>,
}

#[derive(Debug, Default)]
struct RawStage {
    threshold: Option<f64>,
    classifiers: Vec<RawWeak>,
}

#[derive(Debug, Default)]
struct RawWeak {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Debug, Default)]
struct RawFeature {
    rects: Vec<WeightedRect>,
    tilted: bool,
}

impl RawCascade {
    fn open(&mut self, rel: &[&str]) {
        match rel {
            [] => self.seen_cascade = true,
            ["stages", "_"] => self.stages.push(RawStage::default()),
            ["stages", "_", "weakClassifiers", "_"] => {
                if let Some(stage) = self.stages.last_mut() {
                    stage.classifiers.push(RawWeak::default());
                }
            }
            ["features", "_"] => self.features.push(RawFeature::default()),
            _ => {}
        }
    }

    fn text(&mut self, rel: &[&str], text: &str) -> Result<(), String> {
        match rel {
            ["stageType"] => self.stage_type = Some(text.to_string()),
            ["featureType"] => self.feature_type = Some(text.to_string()),
            ["width"] => self.width = Some(parse_one(text, "width")?),
            ["height"] => self.height = Some(parse_one(text, "height")?),
            ["stages", "_", "stageThreshold"] => {
                let stage = self.stages.last_mut().ok_or("stageThreshold outside a stage")?;
                stage.threshold = Some(parse_one(text, "stageThreshold")?);
            }
            ["stages", "_", "weakClassifiers", "_", "internalNodes"] => {
                let weak = self.last_weak()?;
                weak.nodes = parse_nodes(text)?;
            }
            ["stages", "_", "weakClassifiers", "_", "leafValues"] => {
                let weak = self.last_weak()?;
                weak.leaves = parse_list(text, "leafValues")?;
            }
            ["features", "_", "rects", "_"] => {
                let feature = self.features.last_mut().ok_or("rect outside a feature")?;
                feature.rects.push(parse_rect(text)?);
            }
            ["features", "_", "tilted"] => {
                let feature = self.features.last_mut().ok_or("tilted outside a feature")?;
                feature.tilted = parse_one::<i32>(text, "tilted")? != 0;
            }
            _ => {}
        }
        Ok(())
    }

    fn last_weak(&mut self) -> Result<&mut RawWeak, String> {
        self.stages
            .last_mut()
            .and_then(|s| s.classifiers.last_mut())
            .ok_or_else(|| "weak classifier data outside a classifier".to_string())
    }

    fn finish(self) -> Result<HaarCascade, String> {
        if !self.seen_cascade {
            return Err("no <cascade> element (legacy haar-classifier files are not supported)".into());
        }
        match self.stage_type.as_deref() {
            Some("BOOST") => {}
            other => return Err(format!("unsupported stageType {other:?}, expected BOOST")),
        }
        match self.feature_type.as_deref() {
            Some("HAAR") => {}
            other => return Err(format!("unsupported featureType {other:?}, expected HAAR")),
        }

        let width = self.width.ok_or("missing <width>")?;
        let height = self.height.ok_or("missing <height>")?;
        if width < 3 || height < 3 {
            return Err(format!("window {width}x{height} is too small"));
        }

        let features = self
            .features
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                if f.tilted {
                    return Err(format!("feature {i} is tilted; tilted features are not supported"));
                }
                if f.rects.is_empty() {
                    return Err(format!("feature {i} has no rects"));
                }
                for r in &f.rects {
                    if r.x + r.width > width || r.y + r.height > height {
                        return Err(format!("feature {i} rect leaves the {width}x{height} window"));
                    }
                }
                Ok(HaarFeature { rects: f.rects })
            })
            .collect::<Result<Vec<_>, String>>()?;

        if self.stages.is_empty() {
            return Err("cascade has no stages".into());
        }
        let stages = self
            .stages
            .into_iter()
            .enumerate()
            .map(|(si, s)| {
                let threshold = s
                    .threshold
                    .ok_or_else(|| format!("stage {si} has no stageThreshold"))?;
                if s.classifiers.is_empty() {
                    return Err(format!("stage {si} has no weak classifiers"));
                }
                let classifiers = s
                    .classifiers
                    .into_iter()
                    .map(|w| check_tree(w, features.len()).map_err(|e| format!("stage {si}: {e}")))
                    .collect::<Result<Vec<_>, String>>()?;
                Ok(Stage {
                    threshold: threshold - STAGE_THRESHOLD_EPS,
                    classifiers,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(HaarCascade {
            window_width: width,
            window_height: height,
            stages,
            features,
        })
    }
}

/// Children must point forward (positive index) or at a leaf (`-leaf`), so
/// evaluation always terminates.
fn check_tree(weak: RawWeak, n_features: usize) -> Result<WeakClassifier, String> {
    if weak.nodes.is_empty() {
        return Err("weak classifier has no internal nodes".into());
    }
    for (i, node) in weak.nodes.iter().enumerate() {
        if node.feature >= n_features {
            return Err(format!(
                "node references feature {} but only {} exist",
                node.feature, n_features
            ));
        }
        for child in [node.left, node.right] {
            let ok = if child > 0 {
                (child as usize) > i && (child as usize) < weak.nodes.len()
            } else {
                ((-child) as usize) < weak.leaves.len()
            };
            if !ok {
                return Err(format!("node {i} has invalid child {child}"));
            }
        }
    }
    Ok(WeakClassifier {
        nodes: weak.nodes,
        leaves: weak.leaves,
    })
}

fn parse_one<T: FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {what}: {text:?}"))
}

fn parse_list<T: FromStr>(text: &str, what: &str) -> Result<Vec<T>, String> {
    text.split_whitespace().map(|t| parse_one(t, what)).collect()
}

/// `left right featureIdx threshold`, repeated per node.
fn parse_nodes(text: &str) -> Result<Vec<TreeNode>, String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return Err(format!(
            "internalNodes has {} values, expected groups of 4",
            tokens.len()
        ));
    }
    tokens
        .chunks_exact(4)
        .map(|t| {
            Ok(TreeNode {
                left: parse_one(t[0], "node left")?,
                right: parse_one(t[1], "node right")?,
                feature: parse_one(t[2], "node feature index")?,
                threshold: parse_one(t[3], "node threshold")?,
            })
        })
        .collect()
}

/// `x y width height weight`.
fn parse_rect(text: &str) -> Result<WeightedRect, String> {
    let t: Vec<&str> = text.split_whitespace().collect();
    if t.len() != 5 {
        return Err(format!("rect {text:?} must have 5 values"));
    }
    Ok(WeightedRect {
        x: parse_one(t[0], "rect x")?,
        y: parse_one(t[1], "rect y")?,
        width: parse_one(t[2], "rect width")?,
        height: parse_one(t[3], "rect height")?,
        weight: parse_one(t[4], "rect weight")?,
    })
}
