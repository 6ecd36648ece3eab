//! Per-event pipeline and batch runner.
//!
//! Each event runs `fetch -> normalize -> validate -> compute -> record`.
//! Any failure along the way turns that event into a [`SkippedEvent`]; the
//! batch itself only fails on an invalid configuration.

use super::summary::{EventResult, SummaryTable};
use crate::{
    DateRange, EventSpec, EventStudyError, PriceSource, Result, StudyConfig, VolatilityBasis,
    WindowSpec,
    abnormal::{AbnormalReturn, AbnormalReturnEngine},
    series::{PriceBar, PriceSeries, ReturnPoint, normalize},
    significance::{SignificanceTester, TestOutcome},
    volatility::{VolatilityComparison, VolatilityVolumeComparator, gross_return},
    window::{EventWindow, EventWindowExtractor},
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Everything computed for one recorded event.
///
/// Besides the summary record this keeps the window slices that chart
/// consumers plot against the day offsets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAnalysis {
    /// Summary record
    pub result: EventResult,
    /// Abnormal returns over the symmetric window
    pub event_window: EventWindow<AbnormalReturn>,
    /// Stock bars over the symmetric window
    pub stock_window: EventWindow<PriceBar>,
    /// Returns of the strict pre-event partition
    pub pre_event_returns: EventWindow<ReturnPoint>,
    /// Returns of the strict post-event partition
    pub post_event_returns: EventWindow<ReturnPoint>,
    /// Post-event abnormal return test
    pub test: TestOutcome,
    /// Pre/post volatility and volume, unscaled
    pub comparison: VolatilityComparison,
}

impl EventAnalysis {
    /// Ticker of the analyzed event.
    pub fn ticker(&self) -> &str {
        &self.result.ticker
    }

    /// Calendar-day offsets of the abnormal-return window.
    pub fn days_offset(&self) -> &[i64] {
        self.event_window.day_offsets()
    }
}

/// An event that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEvent {
    /// Ticker symbol
    pub ticker: String,
    /// Event date
    pub event_date: NaiveDate,
    /// Window label of the batch
    pub window_label: String,
    /// Why the event was skipped
    pub reason: String,
}

/// Output of one batch run over a single window size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// Window the batch ran with
    pub window: WindowSpec,
    /// One record per analyzed event, in input order
    pub summary: SummaryTable,
    /// Detailed analyses, parallel to `summary`
    pub analyses: Vec<EventAnalysis>,
    /// Skipped events, in input order
    pub skipped: Vec<SkippedEvent>,
}

/// Analyze one event against already normalized series.
///
/// # Errors
/// - [`EventStudyError::MissingData`] when either series is empty
/// - [`EventStudyError::EventDateAbsent`] when the event is not a trading day
/// - [`EventStudyError::EmptySample`] when no post-event abnormal return exists
/// - [`EventStudyError::InsufficientWindow`] when a pre/post partition of the
///   stock, or in trading-day mode of the benchmark, is too short
pub fn analyze_event(
    spec: &EventSpec,
    window: &WindowSpec,
    stock: &PriceSeries,
    benchmark: &PriceSeries,
    config: &StudyConfig,
) -> Result<EventAnalysis> {
    for series in [stock, benchmark] {
        if series.is_empty() {
            return Err(EventStudyError::MissingData {
                ticker: series.ticker().to_string(),
            });
        }
    }
    let date = spec.event_date;
    if !stock.contains(date) {
        return Err(EventStudyError::EventDateAbsent {
            ticker: spec.ticker.clone(),
            date,
        });
    }

    let abnormal = AbnormalReturnEngine::compute(&stock.returns(), &benchmark.returns());
    let extractor = EventWindowExtractor::new(window.days, config.window_mode);
    let event_window = extractor.around(abnormal.rows(), date);
    let stock_window = extractor.around(stock.bars(), date);

    let post_sample: Vec<f64> = event_window.from_event().map(|r| r.abnormal_return).collect();
    let car_post: f64 = post_sample.iter().sum();
    let car_full: f64 = event_window.rows().iter().map(|r| r.abnormal_return).sum();
    let test = SignificanceTester::new(config.test_direction).one_sample(&post_sample)?;

    let basis: Vec<ReturnPoint> = match config.volatility_basis {
        VolatilityBasis::StockReturns => stock.returns().points().to_vec(),
        VolatilityBasis::AbnormalReturns => abnormal
            .rows()
            .iter()
            .map(|r| ReturnPoint {
                date: r.date,
                value: Some(r.abnormal_return),
            })
            .collect(),
    };
    let pre_event_returns = extractor.before(&basis, date)?;
    let post_event_returns = extractor.after(&basis, date)?;
    let pre_bars = extractor.before(stock.bars(), date)?;
    let post_bars = extractor.after(stock.bars(), date)?;

    let values = |w: &EventWindow<ReturnPoint>| -> Vec<f64> {
        w.rows().iter().filter_map(|p| p.value).collect()
    };
    let volumes =
        |w: &EventWindow<PriceBar>| -> Vec<f64> { w.rows().iter().map(|b| b.volume).collect() };
    let comparison = VolatilityVolumeComparator::compare(
        &values(&pre_event_returns),
        &values(&post_event_returns),
        &volumes(&pre_bars),
        &volumes(&post_bars),
    )?;

    // Trading-day partitions must be full for the benchmark too.
    let bench_pre = extractor.before(benchmark.bars(), date)?;
    let bench_post = extractor.after(benchmark.bars(), date)?;
    let relative = |stock_bars: &EventWindow<PriceBar>,
                    bench: &EventWindow<PriceBar>|
     -> Option<f64> {
        Some((gross_return(stock_bars.rows())? - gross_return(bench.rows())?) * 100.0)
    };
    let pre_relative_return_pct = relative(&pre_bars, &bench_pre);
    let post_relative_return_pct = relative(&post_bars, &bench_post);

    let result = EventResult {
        ticker: spec.ticker.clone(),
        window_label: window.label.clone(),
        event_date: date,
        car_post_pct: car_post * 100.0,
        car_full_pct: car_full * 100.0,
        t_stat: test.statistic,
        p_value: test.p_value,
        pre_volatility_pct: comparison.pre_volatility * 100.0,
        post_volatility_pct: comparison.post_volatility * 100.0,
        pre_avg_volume: comparison.pre_avg_volume,
        post_avg_volume: comparison.post_avg_volume,
        pre_relative_return_pct,
        post_relative_return_pct,
    };

    Ok(EventAnalysis {
        result,
        event_window,
        stock_window,
        pre_event_returns,
        post_event_returns,
        test,
        comparison,
    })
}

type Loaded = std::result::Result<PriceSeries, String>;

/// Runs event studies over a configured set of events.
#[derive(Debug)]
pub struct BatchRunner<S> {
    source: S,
    config: StudyConfig,
}

impl<S: PriceSource> BatchRunner<S> {
    /// Create a runner, validating the configuration up front.
    ///
    /// # Errors
    /// Any configuration error; nothing is fetched in that case.
    pub fn new(source: S, config: StudyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Run every configured event for a single window size.
    pub async fn run(&self, window: &WindowSpec) -> Result<BatchReport> {
        let (benchmark, stocks) = self.fetch_all().await?;
        Ok(self.assemble(window, &benchmark, &stocks))
    }

    /// Run one independent batch per configured window.
    ///
    /// Price history is fetched once and shared by all windows.
    pub async fn run_all(&self) -> Result<Vec<BatchReport>> {
        let (benchmark, stocks) = self.fetch_all().await?;
        Ok(self
            .config
            .windows
            .iter()
            .map(|w| self.assemble(w, &benchmark, &stocks))
            .collect())
    }

    async fn fetch_all(&self) -> Result<(Loaded, HashMap<String, Loaded>)> {
        let range = self.config.fetch_range()?;
        let benchmark = self.load(&self.config.benchmark, &range).await;

        let mut tickers: Vec<&str> = Vec::new();
        for spec in &self.config.events {
            if !tickers.contains(&spec.ticker.as_str()) {
                tickers.push(&spec.ticker);
            }
        }
        let stocks = stream::iter(tickers)
            .map(|ticker| async move { (ticker.to_string(), self.load(ticker, &range).await) })
            .buffered(self.config.max_concurrency)
            .collect::<HashMap<_, _>>()
            .await;

        Ok((benchmark, stocks))
    }

    async fn load(&self, ticker: &str, range: &DateRange) -> Loaded {
        let loaded = match self.source.fetch(ticker, range).await {
            Ok(raw) => normalize(ticker, &raw),
            Err(e) => Err(e),
        };
        loaded.map_err(|e| {
            warn!(ticker, error = %e, "price history unavailable");
            e.to_string()
        })
    }

    fn assemble(
        &self,
        window: &WindowSpec,
        benchmark: &Loaded,
        stocks: &HashMap<String, Loaded>,
    ) -> BatchReport {
        info!(
            window = %window.label,
            days = window.days,
            events = self.config.events.len(),
            "running event batch"
        );

        let mut summary = SummaryTable::new();
        let mut analyses = Vec::new();
        let mut skipped = Vec::new();

        for spec in &self.config.events {
            let outcome = match (benchmark, stocks.get(&spec.ticker)) {
                (Err(e), _) => Err(format!("benchmark {}: {e}", self.config.benchmark)),
                (_, None) => Err(format!("no price history fetched for {}", spec.ticker)),
                (_, Some(Err(e))) => Err(e.clone()),
                (Ok(bench), Some(Ok(stock))) => {
                    analyze_event(spec, window, stock, bench, &self.config).map_err(|e| e.to_string())
                }
            };

            match outcome {
                Ok(analysis) => {
                    debug!(
                        ticker = %spec.ticker,
                        event_date = %spec.event_date,
                        car_post_pct = analysis.result.car_post_pct,
                        "event recorded"
                    );
                    summary.push(analysis.result.clone());
                    analyses.push(analysis);
                }
                Err(reason) => {
                    warn!(
                        ticker = %spec.ticker,
                        event_date = %spec.event_date,
                        window = %window.label,
                        %reason,
                        "event skipped"
                    );
                    skipped.push(SkippedEvent {
                        ticker: spec.ticker.clone(),
                        event_date: spec.event_date,
                        window_label: window.label.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            window = %window.label,
            recorded = summary.len(),
            skipped = skipped.len(),
            "event batch complete"
        );

        BatchReport {
            window: window.clone(),
            summary,
            analyses,
            skipped,
        }
    }
}
