//! 包含关系过滤：找出不被其他形状包围盒包住的“外层”形状。

use crate::shape::{BoundingBox, ShapeRecord};

/// 可参与包含判断的对象。
pub trait Bounded {
    fn bounding_box(&self) -> &BoundingBox;
}

impl Bounded for BoundingBox {
    fn bounding_box(&self) -> &BoundingBox {
        self
    }
}

impl Bounded for ShapeRecord {
    fn bounding_box(&self) -> &BoundingBox {
        self.bbox()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Outer,
    /// 被 `container` 处的形状包住（取首个满足条件的容器）。
    Inner { container: usize },
}

impl Containment {
    #[inline]
    pub fn is_outer(self) -> bool {
        matches!(self, Containment::Outer)
    }
}

/// 对每个形状给出分类结果，顺序与输入一致。
///
/// 角点相同的包围盒之间只有先出现者能充当容器，保证重复项中恰好保留第一个。
pub fn classify<T: Bounded>(shapes: &[T]) -> Vec<Containment> {
    shapes
        .iter()
        .enumerate()
        .map(|(index, shape)| {
            let bbox = shape.bounding_box();
            let container = shapes.iter().enumerate().position(|(other_index, other)| {
                if other_index == index {
                    return false;
                }
                let other_bbox = other.bounding_box();
                if !other_bbox.encloses(bbox) {
                    return false;
                }
                // 互相包含即角点一致，视为重复
                if bbox.encloses(other_bbox) {
                    return other_index < index;
                }
                true
            });
            match container {
                Some(container) => Containment::Inner { container },
                None => Containment::Outer,
            }
        })
        .collect()
}

/// 只保留外层形状，保持原顺序。
pub fn filter_outer<T: Bounded>(shapes: Vec<T>) -> Vec<T> {
    let classes = classify(&shapes);
    shapes
        .into_iter()
        .zip(classes)
        .filter_map(|(shape, class)| class.is_outer().then_some(shape))
        .collect()
}
