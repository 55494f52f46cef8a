//! Opportunity scanner.
//!
//! Fans out concurrent DexScreener searches for a fixed list of
//! meme-coin-adjacent seed terms, deduplicates pairs by base-token
//! address, scores each survivor with a liquidity/volume/momentum
//! heuristic, and returns the top candidates sorted by score.
//!
//! The pipeline is two explicit stages: a primary fetch producing a
//! ranked sequence, and a fixed placeholder fallback used when the fetch
//! yields nothing. The scheduler must never be left with an empty set
//! to evaluate on first run.

use async_trait::async_trait;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::OpportunitySource;
use crate::data::dexscreener::{DexScreenerClient, PairRecord};
use crate::types::{ChainKey, Opportunity};

/// Seed search terms. Each runs as an independent, fault-isolated query.
const SEED_TERMS: [&str; 7] = ["pepe", "doge", "shib", "meme", "cat", "baby", "moon"];

/// Hard cap on the number of opportunities returned per scan.
const MAX_RESULTS: usize = 100;

// ---------------------------------------------------------------------------
// Pure pipeline stages
// ---------------------------------------------------------------------------

/// Heuristic score blending volume, liquidity, and short-term momentum.
/// Negative momentum contributes exactly zero — the heuristic rewards
/// upward movement only, it never penalizes.
pub fn score(volume_h24: f64, liquidity_usd: f64, change_h1: f64, change_h24: f64) -> f64 {
    (volume_h24 + 1.0).log10() * 2.0
        + (liquidity_usd + 1.0).log10() * 1.5
        + change_h1.max(0.0) * 0.5
        + change_h24.max(0.0) * 0.1
}

/// Group pairs by base-token address, retaining only the pair with the
/// greatest 24-hour volume per token. Ties break toward first-seen.
/// Pairs without a resolvable base address are dropped here.
fn dedupe_by_base_token(pairs: Vec<PairRecord>) -> Vec<PairRecord> {
    let mut by_address: HashMap<String, PairRecord> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for pair in pairs {
        let Some(address) = pair.base_address().map(str::to_string) else {
            continue;
        };
        match by_address.get(&address) {
            Some(current) if pair.volume_h24() <= current.volume_h24() => {}
            Some(_) => {
                by_address.insert(address, pair);
            }
            None => {
                order.push(address.clone());
                by_address.insert(address, pair);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|addr| by_address.remove(&addr))
        .collect()
}

fn to_opportunity(pair: &PairRecord) -> Opportunity {
    let volume_h24 = pair.volume_h24();
    let liquidity_usd = pair.liquidity_usd();
    let change_h1 = pair.change_h1();
    let change_h24 = pair.change_h24();
    let price_usd = pair.price_usd_f64();
    let base = pair.base_token.as_ref();

    Opportunity {
        address: base
            .and_then(|t| t.address.clone())
            .unwrap_or_default(),
        name: base
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        symbol: base.and_then(|t| t.symbol.clone()).unwrap_or_default(),
        score: score(volume_h24, liquidity_usd, change_h1, change_h24),
        price_usd: (price_usd > 0.0).then_some(price_usd),
        liquidity_usd: (liquidity_usd > 0.0).then_some(liquidity_usd),
        volume_h24: (volume_h24 > 0.0).then_some(volume_h24),
        change_h1: (change_h1 != 0.0).then_some(change_h1),
        change_h24: (change_h24 != 0.0).then_some(change_h24),
        chain_id: pair.chain_id.clone(),
        pair_address: pair.pair_address.clone(),
        sparkline: None,
    }
}

/// Dedupe, score, sort descending, and cap. Pure — each call owns its
/// own intermediate maps, so concurrent scans cannot interfere.
pub fn rank_pairs(pairs: Vec<PairRecord>) -> Vec<Opportunity> {
    let mut opportunities: Vec<Opportunity> = dedupe_by_base_token(pairs)
        .iter()
        .map(to_opportunity)
        .filter(|o| !o.address.is_empty())
        .collect();

    opportunities.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
    });
    opportunities.truncate(MAX_RESULTS);
    opportunities
}

/// Fixed placeholder set returned when the external fetch path fails
/// entirely or yields zero opportunities.
pub fn fallback_opportunities() -> Vec<Opportunity> {
    vec![
        Opportunity::placeholder("0xToken1", "MemeCoin One", "MEME1", 2.5),
        Opportunity::placeholder("0xToken2", "MemeCoin Two", "MEME2", 3.2),
        Opportunity::placeholder("0xToken3", "MemeCoin Three", "MEME3", 1.8),
    ]
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Stateless opportunity scanner over the DexScreener search API.
pub struct OpportunityScanner {
    feed: Arc<DexScreenerClient>,
}

impl OpportunityScanner {
    pub fn new(feed: Arc<DexScreenerClient>) -> Self {
        Self { feed }
    }

    async fn fetch_all_seeds(&self) -> Vec<PairRecord> {
        let queries = SEED_TERMS.iter().map(|term| {
            let feed = Arc::clone(&self.feed);
            async move {
                match feed.search_pairs(term).await {
                    Ok(pairs) => pairs,
                    Err(e) => {
                        warn!(term, error = %e, "Seed query failed, continuing without");
                        Vec::new()
                    }
                }
            }
        });

        join_all(queries).await.into_iter().flatten().collect()
    }
}

#[async_trait]
impl OpportunitySource for OpportunityScanner {
    /// One scan: concurrent seed queries → dedupe → score → rank.
    /// The chain is carried for logging; results span all chains the
    /// feed reports, matching the trading dashboard's display contract.
    async fn scan(&self, chain: ChainKey) -> Vec<Opportunity> {
        let pairs = self.fetch_all_seeds().await;
        let fetched = pairs.len();
        let ranked = rank_pairs(pairs);

        if ranked.is_empty() {
            warn!(chain = %chain, "Scan produced no opportunities, serving fallback set");
            return fallback_opportunities();
        }

        info!(
            chain = %chain,
            pairs = fetched,
            opportunities = ranked.len(),
            top_score = ranked[0].score,
            "Scan complete"
        );
        ranked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
