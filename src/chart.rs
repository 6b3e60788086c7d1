//! Chart series construction and Plotters rendering.
//!
//! The series builders are part of the pipeline contract: they return plain
//! label/value vectors a presentation layer can bind to any widget. The
//! rendering functions below them are glue that writes PNG files.

use ndarray::Array2;
use plotters::prelude::*;

use crate::cluster::{LabeledRecord, SegmentClustering};
use crate::error::{Error, Result};
use crate::vocab::Vocabulary;
use crate::yields::YieldTable;

/// Color per global cluster code (1-based; index 0 unused fallback).
static CLUSTER_COLORS: [RGBColor; 8] = [
    RED,
    BLUE,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
    RGBColor(0, 128, 128),
];

fn color_for(code: u8) -> &'static RGBColor {
    CLUSTER_COLORS
        .get(code.saturating_sub(1) as usize)
        .unwrap_or(&BLACK)
}

fn chart_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Chart(e.to_string())
}

/// A labeled numeric series, ready for any bar/line widget.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Series title.
    pub title: String,
    /// Category labels, one per value.
    pub labels: Vec<String>,
    /// Numeric values.
    pub values: Vec<f64>,
}

/// Offer count per global cluster, every vocabulary entry present.
pub fn cluster_size_series(catalog: &[LabeledRecord], vocabulary: &Vocabulary) -> ChartSeries {
    let labels: Vec<String> = vocabulary
        .entries()
        .iter()
        .map(|l| l.name.to_string())
        .collect();
    let values: Vec<f64> = vocabulary
        .entries()
        .iter()
        .map(|l| catalog.iter().filter(|r| r.cluster == l.code).count() as f64)
        .collect();
    ChartSeries {
        title: "Offers per Cluster".to_string(),
        labels,
        values,
    }
}

/// Fuzzy-partition-coefficient scores per candidate cluster count.
pub fn fpc_series(title: &str, scan: &[(usize, f64)]) -> ChartSeries {
    ChartSeries {
        title: title.to_string(),
        labels: scan.iter().map(|(k, _)| format!("k={k}")).collect(),
        values: scan.iter().map(|(_, score)| *score).collect(),
    }
}

/// Ranking values of a yield table, best first.
pub fn yield_series(title: &str, table: &YieldTable) -> ChartSeries {
    ChartSeries {
        title: title.to_string(),
        labels: table.rows.iter().map(|r| r.key.clone()).collect(),
        values: table.rows.iter().map(|r| r.rank_value()).collect(),
    }
}

/// Render a series as a bar chart PNG.
pub fn render_bar_chart(series: &ChartSeries, output_path: &str) -> Result<()> {
    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let max_value = series.values.iter().cloned().fold(0.0_f64, f64::max);
    let n = series.values.len().max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(&series.title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..n as f64, 0f64..(max_value * 1.1).max(1.0))
        .map_err(chart_err)?;

    let labels = series.labels.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&move |x| {
            let idx = *x as usize;
            labels.get(idx).cloned().unwrap_or_default()
        })
        .y_desc("Value")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(chart_err)?;

    for (i, &value) in series.values.iter().enumerate() {
        let color = CLUSTER_COLORS[i % CLUSTER_COLORS.len()];
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, value)],
                color.filled(),
            )))
            .map_err(chart_err)?;
    }

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Render one segment's embedding as a scatter plot with its centers.
pub fn render_embedding_scatter(
    embedding: &Array2<f64>,
    clustering: &SegmentClustering,
    title: &str,
    output_path: &str,
) -> Result<()> {
    let xs: Vec<f64> = embedding.column(0).to_vec();
    let ys: Vec<f64> = embedding.column(1).to_vec();

    let x_min = xs.iter().cloned().fold(f64::INFINITY, f64::min) - 0.5;
    let x_max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 0.5;
    let y_min = ys.iter().cloned().fold(f64::INFINITY, f64::min) - 0.5;
    let y_max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max) + 0.5;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Component 1")
        .y_desc("Component 2")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(chart_err)?;

    for (i, labeled) in clustering.labeled.iter().enumerate() {
        let color = color_for(labeled.cluster);
        chart
            .draw_series(std::iter::once(Circle::new((xs[i], ys[i]), 4, color.filled())))
            .map_err(chart_err)?;
    }

    // Centers as squares, local order matching the stabilized cluster order.
    for center in clustering.centers.rows() {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [
                    (center[0] - 0.08, center[1] - 0.08),
                    (center[0] + 0.08, center[1] + 0.08),
                ],
                BLACK.filled(),
            )))
            .map_err(chart_err)?;
    }

    root.present().map_err(chart_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRecord;
    use crate::cluster::{cluster, LabeledRecord};
    use crate::segment::SegmentKind;
    use crate::yields::{operator_yield, OfferKind};
    use ndarray::array;
    use std::path::Path;
    use tempfile::tempdir;

    fn labeled(operator: &str, cluster_code: u8) -> LabeledRecord {
        LabeledRecord {
            record: CatalogRecord {
                operator: operator.to_string(),
                price: 10.0,
                main_quota_gb: 5.0,
                validity_days: 30.0,
                app_quota_gb: 0.0,
                fup_gb: 0.0,
            },
            segment: SegmentKind::Capped,
            cluster: cluster_code,
        }
    }

    #[test]
    fn test_cluster_size_series_covers_all_labels() {
        let vocabulary = Vocabulary::standard();
        let catalog = vec![labeled("Alpha", 1), labeled("Beta", 1), labeled("Gamma", 3)];

        let series = cluster_size_series(&catalog, &vocabulary);
        assert_eq!(series.labels.len(), 8);
        assert_eq!(series.values[0], 2.0);
        assert_eq!(series.values[2], 1.0);
        assert_eq!(series.values[4], 0.0);
    }

    #[test]
    fn test_fpc_series_layout() {
        let series = fpc_series("Capped FPC", &[(2, 0.9), (3, 0.7)]);
        assert_eq!(series.labels, vec!["k=2", "k=3"]);
        assert_eq!(series.values, vec![0.9, 0.7]);
    }

    #[test]
    fn test_yield_series_matches_table_order() {
        let catalog = vec![labeled("Alpha", 1), labeled("Beta", 2)];
        let table = operator_yield(&catalog, OfferKind::NonApp).unwrap();
        let series = yield_series("Operator Yield", &table);
        assert_eq!(series.labels.len(), table.rows.len());
        assert_eq!(series.values.len(), table.rows.len());
    }

    #[test]
    fn test_render_bar_chart_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bars.png");
        let series = ChartSeries {
            title: "Test".to_string(),
            labels: vec!["a".to_string(), "b".to_string()],
            values: vec![1.0, 2.0],
        };

        render_bar_chart(&series, path.to_str().unwrap()).unwrap();
        assert!(Path::new(&path).exists());
    }

    #[test]
    fn test_render_embedding_scatter_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scatter.png");

        let embedding = array![
            [0.0, 0.0],
            [0.1, -0.1],
            [-0.1, 0.1],
            [5.0, 5.0],
            [5.1, 4.9],
        ];
        let record = CatalogRecord {
            operator: "Alpha".to_string(),
            price: 10.0,
            main_quota_gb: 5.0,
            validity_days: 30.0,
            app_quota_gb: 0.0,
            fup_gb: 50.0,
        };
        let records = vec![record; 5];
        let clustering = cluster(
            SegmentKind::Uncapped,
            &records,
            &embedding,
            2,
            1.3,
            &Vocabulary::standard(),
        )
        .unwrap();

        render_embedding_scatter(&embedding, &clustering, "Uncapped", path.to_str().unwrap())
            .unwrap();
        assert!(Path::new(&path).exists());
    }
}
