//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::error::{Error, Result};

/// Market-position analysis for mobile-data product catalogs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the product catalog CSV file
    #[arg(short, long, default_value = "catalog.csv")]
    pub input: String,

    /// Base path for rendered chart PNGs
    #[arg(short, long, default_value = "analysis.png")]
    pub output: String,

    /// Cluster to break down in a focused yield table (code 1-8 or label name)
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// Override per-segment fuzziness exponents as "capped,uncapped,app"
    /// Example: --fuzziness "1.3,1.3,1.1"
    #[arg(long)]
    pub fuzziness: Option<String>,

    /// Skip chart rendering and only print tables
    #[arg(long)]
    pub no_charts: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the fuzziness override string.
    /// Expected format: "capped,uncapped,app", each greater than 1.
    pub fn parse_fuzziness(&self) -> Result<Option<[f64; 3]>> {
        let Some(ref raw) = self.fuzziness else {
            return Ok(None);
        };

        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() != 3 {
            return Err(Error::InvalidParameter {
                name: "fuzziness",
                message: format!("expected 3 comma-separated values, got {}", parts.len()),
            });
        }

        let mut values = [0.0; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.trim().parse().map_err(|_| Error::InvalidParameter {
                name: "fuzziness",
                message: format!("invalid value: {part}"),
            })?;
            if *slot <= 1.0 {
                return Err(Error::InvalidParameter {
                    name: "fuzziness",
                    message: format!("must be greater than 1, got {slot}"),
                });
            }
        }
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_fuzziness(fuzziness: Option<&str>) -> Args {
        Args {
            input: "catalog.csv".to_string(),
            output: "analysis.png".to_string(),
            cluster: None,
            fuzziness: fuzziness.map(|s| s.to_string()),
            no_charts: false,
            verbose: false,
        }
    }

    #[test]
    fn test_parse_fuzziness() {
        let args = args_with_fuzziness(Some("1.3,1.3,1.1"));
        assert_eq!(args.parse_fuzziness().unwrap(), Some([1.3, 1.3, 1.1]));

        let args = args_with_fuzziness(None);
        assert_eq!(args.parse_fuzziness().unwrap(), None);

        let args = args_with_fuzziness(Some("1.3,1.3"));
        assert!(args.parse_fuzziness().is_err());

        let args = args_with_fuzziness(Some("1.3,abc,1.1"));
        assert!(args.parse_fuzziness().is_err());

        let args = args_with_fuzziness(Some("1.3,0.9,1.1"));
        assert!(args.parse_fuzziness().is_err());
    }
}
