//! Interactive CLI demo of the TIDEPOOL settlement core.
//!
//! Walks through asset derivation, venue registration, quoting, a
//! committed multi-hop batch swap, and a share-token deposit. The output
//! uses ANSI escape codes for colored, storytelling-style terminal
//! rendering; set RUST_LOG=tidepool_core=debug to watch the ledger work.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use chrono::{Duration, Utc};

use tidepool_core::testing::FixedRateBackend;
use tidepool_core::{AssetId, PathStep, Router, SwapPathExactIn, SwapPathExactOut};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    TIDEPOOL  --  Batch Settlement Demo                             {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  transient accounting, one move per asset     {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!(
        "{CYAN}------------------------------------------------------------------------{RESET}"
    );
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let us = elapsed.as_secs_f64() * 1_000_000.0;
    println!("{DIM}{MAGENTA}  [{label}: {us:.1} us]{RESET}");
}

fn asset_row(name: &str, id: &AssetId, color: &str) {
    let hex = id.to_hex();
    println!(
        "  {color}{BOLD}{name:<10}{RESET}  {DIM}{}...{}{RESET}",
        &hex[..12],
        &hex[hex.len() - 8..]
    );
}

fn balance_row(name: &str, balance: u64, color: &str) {
    println!("  {color}{BOLD}{name:<10}{RESET}  {WHITE}{balance:>12}{RESET} {DIM}units{RESET}");
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let demo_start = Instant::now();
    banner();

    // -----------------------------------------------------------------------
    // Step 1: Asset Universe
    // -----------------------------------------------------------------------

    section(1, "Content-Addressed Asset Derivation");
    subsection("Deriving BLAKE3 asset identifiers from symbol and issuer...");

    let t = Instant::now();
    let usdx = AssetId::derive("USDX", "tide:issuer:stable");
    let rena = AssetId::derive("RENA", "tide:issuer:rena");
    let solv = AssetId::derive("SOLV", "tide:issuer:solv");
    let pool_pr = AssetId::derive("PR-LP", "tide:venue:pr");
    let pool_qs = AssetId::derive("QS-LP", "tide:venue:qs");
    timing("derive x5", t.elapsed());

    println!();
    asset_row("USDX", &usdx, BLUE);
    asset_row("RENA", &rena, GREEN);
    asset_row("SOLV", &solv, MAGENTA);
    asset_row("PR-LP", &pool_pr, CYAN);
    asset_row("QS-LP", &pool_qs, CYAN);
    println!();

    let recovered: AssetId = usdx.to_hex().parse().unwrap();
    assert_eq!(usdx, recovered);
    success("All identifiers pass the hex round-trip");

    // -----------------------------------------------------------------------
    // Step 2: Venue Registration
    // -----------------------------------------------------------------------

    section(2, "Venue Registration & Caller Funding");
    subsection("Registering two pools and funding the caller with 10,000 USDX...");

    let mut backend = FixedRateBackend::new();
    // PR: 1 USDX buys 2 RENA. QS: 1 RENA buys 3 SOLV.
    backend.add_pool(pool_pr, &[(usdx, 4), (rena, 2)], 4);
    backend.add_pool(pool_qs, &[(rena, 3), (solv, 1)], 3);
    backend.fund_caller(usdx, 10_000);
    let mut router = Router::new(backend);

    info("Pool PR", "USDX <-> RENA at 1:2 (share price 4)");
    info("Pool QS", "RENA <-> SOLV at 1:3 (share price 3)");
    balance_row("USDX", 10_000, BLUE);
    success("Two pools registered, caller funded");

    // -----------------------------------------------------------------------
    // Step 3: Quote
    // -----------------------------------------------------------------------

    section(3, "Quote: 1,000 USDX -> RENA -> SOLV");
    subsection("Running the batch in quote mode against a scratch vault...");

    let path = SwapPathExactIn {
        asset_in: usdx,
        steps: vec![
            PathStep {
                venue: pool_pr,
                asset_out: rena,
                is_buffer: false,
            },
            PathStep {
                venue: pool_qs,
                asset_out: solv,
                is_buffer: false,
            },
        ],
        exact_amount_in: 1_000,
        min_amount_out: 0,
    };

    let t = Instant::now();
    let quoted = router.query_swap_exact_in(&[path.clone()], &[]).unwrap();
    timing("quote", t.elapsed());

    info("Quoted output", &format!("{} SOLV", quoted.path_amounts_out[0]));
    assert_eq!(router.vault().backend().caller_balance(usdx), 10_000);
    success("Quote computed; not a single unit moved");

    // -----------------------------------------------------------------------
    // Step 4: Committed Batch Swap
    // -----------------------------------------------------------------------

    section(4, "Commit: the same batch, for real");
    subsection("Opening a session, executing both hops, settling endpoints...");

    let t = Instant::now();
    let result = router
        .swap_exact_in(
            &[path],
            Utc::now() + Duration::minutes(5),
            false,
            &[],
        )
        .unwrap();
    timing("swap + settle", t.elapsed());

    assert_eq!(result.path_amounts_out, quoted.path_amounts_out);
    info("Settled output", &format!("{} SOLV", result.path_amounts_out[0]));
    info(
        "Caller transfers",
        &format!(
            "{} pull(s), {} push(es)",
            router.vault().backend().pulls().len(),
            router.vault().backend().pushes().len()
        ),
    );

    println!();
    println!("  {BOLD}{WHITE}--- Balances After Swap ---{RESET}");
    balance_row("USDX", router.vault().backend().caller_balance(usdx), BLUE);
    balance_row("RENA", router.vault().backend().caller_balance(rena), GREEN);
    balance_row("SOLV", router.vault().backend().caller_balance(solv), MAGENTA);
    println!();
    success("Two hops, two transfers: the intermediate RENA never moved");

    // -----------------------------------------------------------------------
    // Step 5: Share Deposit
    // -----------------------------------------------------------------------

    section(5, "Deposit: 1,000 USDX -> PR pool shares");
    subsection("A path ending at the venue's own share token...");

    let t = Instant::now();
    let deposit = router
        .swap_exact_in(
            &[SwapPathExactIn {
                asset_in: usdx,
                steps: vec![PathStep {
                    venue: pool_pr,
                    asset_out: pool_pr,
                    is_buffer: false,
                }],
                exact_amount_in: 1_000,
                min_amount_out: 0,
            }],
            Utc::now() + Duration::minutes(5),
            false,
            &[],
        )
        .unwrap();
    timing("deposit", t.elapsed());

    info(
        "Shares received",
        &format!("{} PR-LP", deposit.path_amounts_out[0]),
    );
    success("Shares issued directly to the caller, reported but never re-pushed");

    // -----------------------------------------------------------------------
    // Step 6: Exact-Out
    // -----------------------------------------------------------------------

    section(6, "Exact-out: buy exactly 300 SOLV");
    subsection("Walking the same path backward to price the input...");

    let t = Instant::now();
    let exact_out = router
        .swap_exact_out(
            &[SwapPathExactOut {
                asset_in: usdx,
                steps: vec![
                    PathStep {
                        venue: pool_pr,
                        asset_out: rena,
                        is_buffer: false,
                    },
                    PathStep {
                        venue: pool_qs,
                        asset_out: solv,
                        is_buffer: false,
                    },
                ],
                max_amount_in: 1_000,
                exact_amount_out: 300,
            }],
            Utc::now() + Duration::minutes(5),
            false,
            &[],
        )
        .unwrap();
    timing("exact-out swap", t.elapsed());

    info(
        "Input charged",
        &format!("{} USDX for exactly 300 SOLV", exact_out.path_amounts_in[0]),
    );
    success("Backward walk priced the input; forward bounds still held");

    // -----------------------------------------------------------------------
    // Final Summary
    // -----------------------------------------------------------------------

    let total_elapsed = demo_start.elapsed();

    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    DEMO COMPLETE -- Final Summary                                  {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();

    println!("  {BOLD}{WHITE}Session Statistics:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    info("Batches committed", "3 (two-hop, deposit, exact-out)");
    info("Quotes served", "1 (zero movement)");
    info(
        "Caller transfers",
        &format!(
            "{} pulls, {} pushes total",
            router.vault().backend().pulls().len(),
            router.vault().backend().pushes().len()
        ),
    );
    info("Asset identifiers", "BLAKE3 over symbol and issuer");
    info("Reconciliation", "every session closed with all deltas at zero");
    println!();

    println!("  {BOLD}{WHITE}Final Balances:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    balance_row("USDX", router.vault().backend().caller_balance(usdx), BLUE);
    balance_row("SOLV", router.vault().backend().caller_balance(solv), MAGENTA);
    balance_row("PR-LP", router.vault().backend().caller_balance(pool_pr), CYAN);

    println!();
    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}ms{RESET}",
        total_elapsed.as_secs_f64() * 1000.0
    );
    println!();
}
