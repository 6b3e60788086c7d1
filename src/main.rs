//! Tariffscope: market-position analysis CLI
//!
//! This is the main entrypoint that orchestrates catalog loading, the
//! segmentation/reduction/clustering pipeline, yield ranking, and chart
//! rendering.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;

use tariffscope::{
    chart, cluster, yields, Args, OfferKind, PipelineParams, SegmentKind, Session, YieldTable,
};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        println!("Tariffscope - Data Product Market Position");
        println!("==========================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load the catalog snapshot.
    if args.verbose {
        println!("Step 1: Loading catalog");
        println!("  Input file: {}", args.input);
    }
    let load_start = Instant::now();
    let catalog = tariffscope::load_catalog(&args.input)?;
    println!("✓ Catalog loaded: {} offers", catalog.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Run the analysis pipeline.
    let params = match args.parse_fuzziness()? {
        Some(fuzziness) => PipelineParams { fuzziness },
        None => PipelineParams::default(),
    };
    if args.verbose {
        println!("\nStep 2: Segmenting, reducing, and clustering");
        println!("  Fuzziness exponents: {:?}", params.fuzziness);
    }

    let fuzziness = params.fuzziness;
    let mut session = Session::with_params(catalog, params);
    let vocabulary = session.vocabulary().clone();
    let pipeline_start = Instant::now();
    let analysis = session.analysis()?;
    println!(
        "✓ Pipeline complete in {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    println!("\n=== Segment Statistics ===");
    for kind in SegmentKind::ALL {
        let segment = analysis.segmented.get(kind);
        let clustering = analysis.clustering(kind);
        let converged = match clustering.termination {
            cluster::Termination::Converged { iterations } => {
                format!("converged in {iterations} iterations")
            }
            cluster::Termination::IterationCap => "hit iteration cap".to_string(),
        };
        println!(
            "{:10} | {:3} offers | {} clusters | FPC {:.3} | {}",
            kind.name(),
            segment.records.len(),
            kind.cluster_count(),
            clustering.fpc,
            converged
        );
    }

    let labeled = analysis.labeled_catalog();

    println!("\n=== Cluster Sizes ===");
    let sizes = chart::cluster_size_series(&labeled, &vocabulary);
    for (label, value) in sizes.labels.iter().zip(&sizes.values) {
        println!("  {:26} {:>4} offers", label, *value as usize);
    }

    // Step 3: Yield rankings.
    println!("\n=== Operator Yield (non-app) ===");
    let non_app = yields::operator_yield(&labeled, OfferKind::NonApp)?;
    print_yield_table(&non_app);

    println!("\n=== Operator Yield (app-inclusive) ===");
    let app = yields::operator_yield(&labeled, OfferKind::AppInclusive)?;
    print_yield_table(&app);

    println!("\n=== Cluster Yield (non-app) ===");
    let per_cluster = yields::all_cluster_yield(&labeled, OfferKind::NonApp, &vocabulary)?;
    print_yield_table(&per_cluster);

    if let Some(ref selector) = args.cluster {
        let label = vocabulary.resolve(selector)?;
        let kind = if label.segment == SegmentKind::AppBundle {
            OfferKind::AppInclusive
        } else {
            OfferKind::NonApp
        };
        println!("\n=== Operator Yield in `{}` ===", label.name);
        let focused = yields::cluster_yield(&labeled, selector, kind, &vocabulary)?;
        print_yield_table(&focused);
    }

    // Step 4: Charts.
    if !args.no_charts {
        if args.verbose {
            println!("\nStep 3: Rendering charts");
        }
        let chart_start = Instant::now();

        for kind in SegmentKind::ALL {
            let path = args
                .output
                .replace(".png", &format!("_{}.png", kind.name()));
            chart::render_embedding_scatter(
                analysis.embedding(kind),
                analysis.clustering(kind),
                &format!("{} offers, embedding space", kind.name()),
                &path,
            )?;
            if args.verbose {
                println!("  Wrote {path}");
            }
        }

        // Crispness diagnostic per segment, across candidate cluster counts.
        for kind in SegmentKind::ALL {
            let embedding = analysis.embedding(kind);
            let max_k = embedding.nrows().saturating_sub(1).min(6);
            if max_k < 2 {
                continue;
            }
            let scan = cluster::fitness_scan(embedding, fuzziness[kind as usize], 2..=max_k)?;
            let series =
                chart::fpc_series(&format!("{} FPC by cluster count", kind.name()), &scan);
            chart::render_bar_chart(
                &series,
                &args.output.replace(".png", &format!("_fpc_{}.png", kind.name())),
            )?;
            if args.verbose {
                for (k, score) in &scan {
                    println!("  {} FPC k={k}: {score:.3}", kind.name());
                }
            }
        }

        chart::render_bar_chart(&sizes, &args.output.replace(".png", "_sizes.png"))?;
        chart::render_bar_chart(
            &chart::yield_series("Operator Yield (non-app)", &non_app),
            &args.output.replace(".png", "_yield.png"),
        )?;

        println!(
            "\n✓ Charts rendered in {:.2}s",
            chart_start.elapsed().as_secs_f64()
        );
    }

    println!(
        "\nTotal processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn print_yield_table(table: &YieldTable) {
    if table.rows.is_empty() {
        println!("  (no offers in this selection)");
    }
    for (rank, row) in table.rows.iter().enumerate() {
        match row.app_yield {
            Some(app_yield) => println!(
                "  {:2}. {:24} main {:.3} GB/unit, app {:.3} GB/unit ({} offers)",
                rank + 1,
                row.key,
                row.main_yield,
                app_yield,
                row.n_offers
            ),
            None => println!(
                "  {:2}. {:24} {:.3} GB/unit ({} offers)",
                rank + 1,
                row.key,
                row.main_yield,
                row.n_offers
            ),
        }
    }
    for excluded in &table.excluded {
        println!("   - excluded {} ({})", excluded.operator, excluded.reason);
    }
}
