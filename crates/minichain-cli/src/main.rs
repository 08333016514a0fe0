//! Demo driver for the in-memory ledger: submit transactions, mine, inspect.
use anyhow::{bail, Context, Result};
use clap::Parser;
use minichain_core::chain::Ledger;
use minichain_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD};
use minichain_core::Transaction;
use std::collections::BTreeSet;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "minichain")]
#[command(about = "Single-process hash-chained ledger with proof-of-work sealing")]
struct Args {
    /// Required leading zero hex characters in a sealed block hash
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Amount credited to the miner per sealed block
    #[arg(long, default_value_t = DEFAULT_MINING_REWARD)]
    reward: i64,

    /// Address credited with mining rewards
    #[arg(long, default_value = "miner-1")]
    miner: String,

    /// Transaction to submit, as from:to:amount (repeatable)
    #[arg(long = "tx")]
    txs: Vec<String>,

    /// Number of blocks to mine
    #[arg(long, default_value_t = 1)]
    blocks: u32,

    /// Tamper with the first mined block afterwards to demonstrate detection
    #[arg(long, default_value_t = false)]
    tamper: bool,
}

fn parse_tx(raw: &str) -> Result<Transaction> {
    let mut parts = raw.splitn(3, ':');
    let (Some(from), Some(to), Some(amount)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected from:to:amount, got {raw:?}");
    };
    let amount: i64 = amount
        .parse()
        .with_context(|| format!("bad amount in {raw:?}"))?;
    Ok(Transaction::new(from, to, amount))
}

fn print_chain(ledger: &Ledger) -> Result<()> {
    let view: Vec<_> = ledger
        .chain()
        .iter()
        .map(|b| {
            serde_json::json!({
                "timestamp": b.timestamp(),
                "previous_hash": hex::encode(b.previous_hash()),
                "hash": b.hash_hex(),
                "nonce": b.nonce(),
                "transactions": b.transactions(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn print_balances(ledger: &Ledger) {
    let addresses: BTreeSet<&str> = ledger
        .chain()
        .iter()
        .flat_map(|b| b.transactions())
        .flat_map(|tx| [tx.from.as_str(), tx.to.as_str()])
        .filter(|addr| !addr.is_empty())
        .collect();
    for addr in addresses {
        println!("balance {addr}: {}", ledger.balance_of(addr));
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut ledger = Ledger::new(args.difficulty, args.reward);

    let txs = if args.txs.is_empty() {
        vec![
            Transaction::new("alice", "bob", 5),
            Transaction::new("bob", "carol", 2),
        ]
    } else {
        args.txs
            .iter()
            .map(|raw| parse_tx(raw))
            .collect::<Result<Vec<_>>>()?
    };

    for tx in txs {
        ledger.submit_transaction(tx);
    }
    for _ in 0..args.blocks {
        ledger.mine_block(&args.miner);
    }

    print_chain(&ledger)?;
    print_balances(&ledger);
    println!("chain valid: {}", ledger.is_valid());

    if args.tamper {
        if ledger.chain().len() < 2 {
            bail!("nothing to tamper with: mine at least one block");
        }
        let block = ledger.block_mut(1).expect("block 1 exists");
        block.transactions_mut()[0].amount = 500;
        println!("tampered with block 1, amount rewritten to 500");
        print_balances(&ledger);
        println!("chain valid: {}", ledger.is_valid());
    }
    Ok(())
}
