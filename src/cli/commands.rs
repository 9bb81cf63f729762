use crate::agent::{ForecastContext, ForecastOracle};
use crate::config::RelevanceConfig;
use crate::error::Result;
use crate::exchange::MarketCatalog;
use crate::retrieval::LexicalIndex;
use crate::strategy::{CycleOutcome, RelevanceFilter};

fn format_prices(outcomes: &[String], prices: &[Option<rust_decimal::Decimal>]) -> String {
    outcomes
        .iter()
        .zip(prices)
        .map(|(o, p)| match p {
            Some(p) => format!("{}={}", o, p),
            None => format!("{}=-", o),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn show_markets(catalog: &dyn MarketCatalog, limit: usize) -> Result<()> {
    println!("Fetching tradeable markets...\n");
    let snapshot = catalog.snapshot().await?;

    for market in snapshot.markets.iter().filter(|m| m.active && !m.closed).take(limit) {
        println!("  {}  {}", market.id, market.question);
        println!("      {}", format_prices(&market.outcomes, &market.prices));
    }
    println!(
        "\n  {} events, {} markets",
        snapshot.events.len(),
        snapshot.markets.len()
    );
    Ok(())
}

pub async fn show_candidates(catalog: &dyn MarketCatalog, config: RelevanceConfig, thesis: &str) -> Result<()> {
    println!("Filtering markets for: {}\n", thesis);
    let snapshot = catalog.snapshot().await?;
    let index = LexicalIndex::from_catalog(&snapshot.events, &snapshot.markets);

    match RelevanceFilter::new(config).filter(&snapshot, &index, thesis).await {
        Ok(candidates) => {
            for c in candidates {
                println!(
                    "  {:>6}  {:<40} @ {}  {}",
                    c.relevance.round_dp(3),
                    c.label(),
                    c.observed_price,
                    c.market.question
                );
            }
        }
        Err(e) if e.is_no_trade() => println!("  (none) {}", e),
        Err(e) => return Err(e),
    }
    println!();
    Ok(())
}

pub async fn ask_forecast(
    oracle: &dyn ForecastOracle,
    event_title: &str,
    question: &str,
    outcome: &str,
) -> Result<()> {
    let context = ForecastContext {
        outcome: outcome.to_string(),
        event_title: event_title.to_string(),
        ..ForecastContext::default()
    };
    let answer = oracle.estimate(question, &context).await?;

    println!("{}\n", answer.rationale);
    println!("  {} / {}: p = {:.3}", question, outcome, answer.probability);
    Ok(())
}

pub fn print_outcome(outcome: &CycleOutcome) {
    match outcome {
        CycleOutcome::NoTrade { reason } => {
            println!("No trade this cycle: {}", reason);
        }
        CycleOutcome::Executed(report) | CycleOutcome::Abandoned(report) => {
            let p = &report.proposal;
            let r = &report.result;
            println!("Run {}", report.run_id);
            println!(
                "  {} {}/{} {} @ {}",
                p.direction,
                p.market().id,
                p.outcome(),
                report.order.order.size(),
                report.order.order.price()
            );
            println!(
                "  p={} edge={} ev={} fee={}",
                p.estimate.probability, p.edge, p.expected_value, p.fee_estimate
            );
            println!("  result: {:?} after {} attempt(s)", r.outcome, r.attempts);
            if let Some(id) = &r.order_id {
                println!("  order id: {}", id);
            }
            if let Some(reason) = &r.reason {
                println!("  reason: {}", reason);
            }
        }
    }
}
