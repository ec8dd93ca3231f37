use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::Node;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(String),
    #[error("invalid number {value:?} in <{element}>")]
    InvalidNumber { element: String, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("invalid cascade: {0}")]
    Invalid(String),
}

/// One weighted rectangle of a Haar feature, in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HaarRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<HaarRect>,
    /// Rectangles are rotated by 45 degrees.
    pub tilted: bool,
}

/// Internal split node. Child indices `> 0` point at another node,
/// indices `<= 0` at leaf `-index`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

impl WeakClassifier {
    /// Walks the tree from the root using `feature_value` for each split.
    pub fn evaluate(&self, mut feature_value: impl FnMut(usize) -> f64) -> f32 {
        let mut idx = 0i32;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize];
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f32,
    pub classifiers: Vec<WeakClassifier>,
}

/// A boosted Haar cascade as trained by `opencv_traincascade`.
#[derive(Clone, Debug, PartialEq)]
pub struct HaarCascade {
    pub window_width: u32,
    pub window_height: u32,
    pub stages: Vec<Stage>,
    pub features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let xml = fs::read_to_string(path).map_err(|e| CascadeError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_xml(&xml)
    }

    /// Parses the `<opencv_storage><cascade>` XML layout.
    pub fn from_xml(xml: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        let cascade = if root.has_tag_name("cascade") {
            root
        } else {
            match child(root, "cascade") {
                Ok(node) => node,
                Err(e) => {
                    let legacy = root
                        .children()
                        .any(|c| c.attribute("type_id") == Some("opencv-haar-classifier"));
                    if legacy {
                        return Err(CascadeError::Unsupported(
                            "legacy opencv-haar-classifier layout; convert it with opencv_traincascade"
                                .into(),
                        ));
                    }
                    return Err(e);
                }
            }
        };

        let stage_type = text(child(cascade, "stageType")?);
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
        }
        let feature_type = text(child(cascade, "featureType")?);
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!("feature type {feature_type}")));
        }

        let window_width: u32 = scalar(child(cascade, "width")?)?;
        let window_height: u32 = scalar(child(cascade, "height")?)?;
        if window_width < 3 || window_height < 3 {
            return Err(CascadeError::Invalid(format!(
                "window {window_width}x{window_height} is smaller than 3x3"
            )));
        }

        let stages = items(child(cascade, "stages")?)
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;
        let features = items(child(cascade, "features")?)
            .map(parse_feature)
            .collect::<Result<Vec<_>, _>>()?;

        let cascade = Self {
            window_width,
            window_height,
            stages,
            features,
        };
        cascade.validate()?;
        Ok(cascade)
    }

    pub fn has_tilted_features(&self) -> bool {
        self.features.iter().any(|f| f.tilted)
    }

    fn validate(&self) -> Result<(), CascadeError> {
        if self.stages.is_empty() {
            return Err(CascadeError::Invalid("no stages".into()));
        }
        for (si, stage) in self.stages.iter().enumerate() {
            if stage.classifiers.is_empty() {
                return Err(CascadeError::Invalid(format!("stage {si} has no classifiers")));
            }
            for (wi, weak) in stage.classifiers.iter().enumerate() {
                validate_tree(weak, self.features.len())
                    .map_err(|msg| CascadeError::Invalid(format!("stage {si} tree {wi}: {msg}")))?;
            }
        }
        let (ww, wh) = (self.window_width as i32, self.window_height as i32);
        for (fi, feature) in self.features.iter().enumerate() {
            for r in &feature.rects {
                let inside = if feature.tilted {
                    r.x - r.height >= 0
                        && r.x + r.width <= ww
                        && r.y >= 0
                        && r.y + r.width + r.height <= wh
                } else {
                    r.x >= 0 && r.y >= 0 && r.x + r.width <= ww && r.y + r.height <= wh
                };
                if !inside || r.width < 0 || r.height < 0 {
                    return Err(CascadeError::Invalid(format!(
                        "feature {fi} rectangle {r:?} leaves the {ww}x{wh} window"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn validate_tree(weak: &WeakClassifier, feature_count: usize) -> Result<(), String> {
    let node_count = weak.nodes.len() as i32;
    let leaf_count = weak.leaves.len() as i32;
    for (ni, node) in weak.nodes.iter().enumerate() {
        if node.feature >= feature_count {
            return Err(format!("feature index {} out of range", node.feature));
        }
        for child in [node.left, node.right] {
            let ok = if child > 0 {
                // Children always come after their parent, which rules out cycles.
                child < node_count && child as usize > ni
            } else {
                -child < leaf_count
            };
            if !ok {
                return Err(format!("node {ni} has dangling child {child}"));
            }
        }
    }
    Ok(())
}

fn parse_stage(node: Node) -> Result<Stage, CascadeError> {
    let threshold: f32 = scalar(child(node, "stageThreshold")?)?;
    let classifiers = items(child(node, "weakClassifiers")?)
        .map(parse_weak_classifier)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak_classifier(node: Node) -> Result<WeakClassifier, CascadeError> {
    let internal = child(node, "internalNodes")?;
    let raw = tokens(internal);
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(CascadeError::Invalid(format!(
            "internalNodes holds {} values, expected groups of 4",
            raw.len()
        )));
    }
    let nodes = raw
        .chunks_exact(4)
        .map(|c| {
            Ok(TreeNode {
                left: parse_token(internal, &c[0])?,
                right: parse_token(internal, &c[1])?,
                feature: parse_token(internal, &c[2])?,
                threshold: parse_token(internal, &c[3])?,
            })
        })
        .collect::<Result<Vec<_>, CascadeError>>()?;

    let leaves: Vec<f32> = numbers(child(node, "leafValues")?)?;
    if leaves.len() != nodes.len() + 1 {
        return Err(CascadeError::Invalid(format!(
            "{} nodes need {} leaves, found {}",
            nodes.len(),
            nodes.len() + 1,
            leaves.len()
        )));
    }
    Ok(WeakClassifier { nodes, leaves })
}

fn parse_feature(node: Node) -> Result<HaarFeature, CascadeError> {
    let rects = items(child(node, "rects")?)
        .map(|r| {
            let values: Vec<f32> = numbers(r)?;
            if values.len() != 5 {
                return Err(CascadeError::Invalid(format!(
                    "rectangle needs 5 values, found {}",
                    values.len()
                )));
            }
            Ok(HaarRect {
                x: values[0] as i32,
                y: values[1] as i32,
                width: values[2] as i32,
                height: values[3] as i32,
                weight: values[4],
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if rects.is_empty() {
        return Err(CascadeError::Invalid("feature without rectangles".into()));
    }
    let tilted = match child(node, "tilted") {
        Ok(t) => scalar::<i32>(t)? != 0,
        Err(_) => false,
    };
    Ok(HaarFeature { rects, tilted })
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Result<Node<'a, 'i>, CascadeError> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .ok_or_else(|| CascadeError::MissingElement(name.to_string()))
}

/// The `<_>` entries of an OpenCV sequence node.
fn items<'a, 'i: 'a>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children().filter(|c| c.has_tag_name("_"))
}

fn text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn tokens(node: Node) -> Vec<String> {
    text(node).split_whitespace().map(str::to_string).collect()
}

fn parse_token<T: FromStr>(node: Node, token: &str) -> Result<T, CascadeError> {
    token.parse().map_err(|_| CascadeError::InvalidNumber {
        element: node.tag_name().name().to_string(),
        value: token.to_string(),
    })
}

fn numbers<T: FromStr>(node: Node) -> Result<Vec<T>, CascadeError> {
    tokens(node).iter().map(|t| parse_token(node, t)).collect()
}

fn scalar<T: FromStr>(node: Node) -> Result<T, CascadeError> {
    parse_token(node, &text(node))
}
