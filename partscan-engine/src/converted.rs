use std::collections::HashSet;
use std::path::Path;

use partscan_config::{AppConfig, ConvertedConfig, PreviewConfig};
use partscan_core::{
    geometry::Bounds2D,
    shape::{BoundingBox, ShapeRecord, SourceKind},
    units::UnitNormalizer,
};
use partscan_io::{DrawingLoader, SvgDocument, SvgFacade, SvgOptions, VectorConverter};
use tracing::{debug, info};

use crate::adapter::FormatAdapter;
use crate::errors::EngineError;
use crate::thumbnail;
use crate::vector::{placed_bounds, placed_geometry};

/// 转换结果按文档顺序读取全部 `path`，包括转换器写进 `<defs>` 的画板裁剪路径。
const OUTPUT_OPTIONS: SvgOptions = SvgOptions {
    paths_only: true,
    include_non_rendered: true,
};

/// `.ai` 路径：先由外部程序转为纯 SVG，再按 PDF 点坐标读取路径。
#[derive(Debug, Clone)]
pub struct ConvertedAdapter<C> {
    converter: C,
    apply_transforms: bool,
    options: ConvertedConfig,
    preview: PreviewConfig,
}

impl<C: VectorConverter> ConvertedAdapter<C> {
    pub fn from_config(converter: C, config: &AppConfig) -> Self {
        Self {
            converter,
            apply_transforms: config.svg.apply_transforms,
            options: config.converted.clone(),
            preview: config.preview.clone(),
        }
    }

    pub fn shapes_from_document(
        &self,
        document: &SvgDocument,
    ) -> Result<Vec<ShapeRecord>, EngineError> {
        let normalizer = UnitNormalizer::converted(document.view_box);
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(document.elements.len());
        for element in &document.elements {
            let Some(raw) = placed_bounds(element, self.apply_transforms) else {
                continue;
            };
            let key = dedupe_key(&raw, self.options.dedupe_decimals);
            if self.options.dedupe && !seen.insert(key) {
                debug!(id = element.id.as_deref(), "重复路径，已跳过");
                continue;
            }
            let geometry = placed_geometry(element, self.apply_transforms);
            let bbox = BoundingBox::from(normalizer.normalize_bounds(&raw));
            let preview =
                thumbnail::vector_previews(&geometry, &raw, &self.preview, normalizer.flips_y());
            let mut record =
                ShapeRecord::new(SourceKind::ConvertedVector, bbox)?.with_thumbnail(preview);
            if let Some(id) = &element.id {
                record = record.with_description(id.as_str());
            }
            records.push(record);
        }

        // 转换器输出的第一条路径是画板背景
        if self.options.drop_leading_artboard && records.len() > 1 {
            records.remove(0);
        }
        Ok(records)
    }
}

impl<C: VectorConverter> FormatAdapter for ConvertedAdapter<C> {
    fn kind(&self) -> SourceKind {
        SourceKind::ConvertedVector
    }

    fn analyze(&self, path: &Path) -> Result<Vec<ShapeRecord>, EngineError> {
        let svg_path = self.converter.convert(path)?;
        let document = SvgFacade::with_options(OUTPUT_OPTIONS).load(&svg_path)?;
        info!(
            svg = %svg_path.display(),
            elements = document.elements.len(),
            "转换结果读取完成"
        );
        self.shapes_from_document(&document)
    }
}

/// 按指定小数位四舍五入后的包围盒，作为去重键。
fn dedupe_key(raw: &Bounds2D, decimals: u32) -> [i64; 4] {
    let factor = 10f64.powi(decimals as i32);
    let round = |v: f64| (v * factor).round() as i64;
    [
        round(raw.min().x()),
        round(raw.min().y()),
        round(raw.max().x()),
        round(raw.max().y()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use partscan_core::units::PT_TO_MM;
    use partscan_io::IoError;

    struct FixedOutput(PathBuf);

    impl VectorConverter for FixedOutput {
        fn convert(&self, _input: &Path) -> Result<PathBuf, IoError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl VectorConverter for Failing {
        fn convert(&self, _input: &Path) -> Result<PathBuf, IoError> {
            Err(IoError::ConverterFailed {
                program: "inkscape".into(),
                status: "exit status: 1".into(),
                stderr: String::new(),
            })
        }
    }

    fn document(body: &str) -> SvgDocument {
        let source = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="300pt" height="200pt" viewBox="0 0 300 200">{body}</svg>"#
        );
        SvgFacade::with_options(OUTPUT_OPTIONS)
            .parse_str(&source)
            .expect("SVG 解析失败")
    }

    fn adapter(config: &AppConfig) -> ConvertedAdapter<Failing> {
        ConvertedAdapter::from_config(Failing, config)
    }

    #[test]
    fn flips_y_and_drops_artboard() {
        let doc = document(
            r#"<path d="M0 0 H300 V200 H0 Z"/>
               <path d="M0 10 H72 V30 H0 Z"/>"#,
        );
        let shapes = adapter(&AppConfig::default())
            .shapes_from_document(&doc)
            .unwrap();
        assert_eq!(shapes.len(), 1);
        let bbox = shapes[0].bbox();
        assert_eq!(bbox.min_y, (200.0 - 30.0) * PT_TO_MM);
        assert_eq!(bbox.max_y, (200.0 - 10.0) * PT_TO_MM);
        assert!((shapes[0].width() - 25.4).abs() < 1e-9);
        assert_eq!(shapes[0].source_kind(), SourceKind::ConvertedVector);
    }

    #[test]
    fn artboard_clip_in_defs_is_the_dropped_record() {
        let doc = document(
            r#"<defs><clipPath id="board"><path d="M0 0 H300 V200 H0 Z"/></clipPath></defs>
               <g clip-path="url(#board)">
                 <path id="partA" d="M10 10 H40 V40 H10 Z"/>
                 <path id="partB" d="M100 10 H140 V60 H100 Z"/>
               </g>"#,
        );
        let shapes = adapter(&AppConfig::default())
            .shapes_from_document(&doc)
            .unwrap();
        let ids: Vec<_> = shapes.iter().map(|s| s.description()).collect();
        assert_eq!(ids, ["partA", "partB"]);
    }

    #[test]
    fn visible_artboard_duplicating_clip_is_deduped() {
        let doc = document(
            r#"<defs><clipPath id="board"><path d="M0 0 H300 V200 H0 Z"/></clipPath></defs>
               <path id="background" d="M0 0 H300 V200 H0 Z"/>
               <path id="part" d="M10 10 H40 V40 H10 Z"/>"#,
        );
        let shapes = adapter(&AppConfig::default())
            .shapes_from_document(&doc)
            .unwrap();
        let ids: Vec<_> = shapes.iter().map(|s| s.description()).collect();
        assert_eq!(ids, ["part"]);
    }

    #[test]
    fn single_path_is_kept() {
        let doc = document(r#"<path d="M0 0 H10 V10 Z"/>"#);
        let shapes = adapter(&AppConfig::default())
            .shapes_from_document(&doc)
            .unwrap();
        assert_eq!(shapes.len(), 1);
    }

    #[test]
    fn duplicates_are_removed_after_rounding() {
        let doc = document(
            r#"<path d="M0 0 H300 V200 H0 Z"/>
               <path d="M1 1 H5 V5 Z"/>
               <path d="M1.001 1 H5 V5.004 Z"/>
               <rect x="20" y="20" width="5" height="5"/>"#,
        );
        let shapes = adapter(&AppConfig::default())
            .shapes_from_document(&doc)
            .unwrap();
        assert_eq!(shapes.len(), 1);

        let mut config = AppConfig::default();
        config.converted.dedupe = false;
        config.converted.drop_leading_artboard = false;
        let shapes = adapter(&config).shapes_from_document(&doc).unwrap();
        assert_eq!(shapes.len(), 3);
    }

    #[test]
    fn converter_failure_is_external_process_error() {
        let err = adapter(&AppConfig::default())
            .analyze(Path::new("art.ai"))
            .unwrap_err();
        assert!(matches!(err, EngineError::ExternalProcess(_)));
    }

    #[test]
    fn reads_converter_output() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let svg = dir.path().join("art.svg");
        std::fs::write(
            &svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M0 0 H100 V100 H0 Z"/><path d="M10 10 H20 V20 H10 Z"/></svg>"#,
        )
        .unwrap();
        let adapter = ConvertedAdapter::from_config(FixedOutput(svg), &AppConfig::default());
        let shapes = adapter.analyze(&dir.path().join("art.ai")).unwrap();
        assert_eq!(shapes.len(), 1);
        assert!((shapes[0].width() - 10.0 * PT_TO_MM).abs() < 1e-9);
    }
}
