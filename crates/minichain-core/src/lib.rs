use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod constants;
pub mod mine;

use constants::HASH_SIZE;

pub type Hash = [u8; HASH_SIZE];

/// Sentinel previous-hash of the genesis block.
pub const ZERO_HASH: Hash = [0u8; HASH_SIZE];

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: i64,
}

impl Transaction {
    /// An empty `from` marks a reward or genesis entry. Nothing is validated;
    /// any identifiers and any amount are accepted.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    timestamp: u64,
    transactions: Vec<Transaction>,
    previous_hash: Hash,
    nonce: u64,
    hash: Hash,
}

impl Block {
    pub fn new(timestamp: u64, transactions: Vec<Transaction>, previous_hash: Hash) -> Self {
        let mut block = Self {
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: ZERO_HASH,
        };
        block.hash = block.compute_hash();
        block
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> Hash {
        self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Everything that feeds the hash except the nonce, so mining can reuse
    /// the serialized prefix across attempts.
    pub(crate) fn preimage_prefix(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HASH_SIZE + 8);
        bytes.extend_from_slice(&self.previous_hash);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&serde_json::to_vec(&self.transactions).unwrap());
        bytes
    }

    pub(crate) fn hash_with_nonce(prefix: &[u8], nonce: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(prefix);
        hasher.update(nonce.to_le_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(&digest[..]);
        out
    }

    /// Recompute the hash from the current field values. Chain validation
    /// compares this against the stored hash to detect in-place tampering.
    pub fn compute_hash(&self) -> Hash {
        Self::hash_with_nonce(&self.preimage_prefix(), self.nonce)
    }

    /// Increment the nonce and rehash until the hash starts with `difficulty`
    /// zero hex characters. Blocking and unbounded; expected cost grows as
    /// roughly 16^difficulty attempts.
    pub fn mine(&mut self, difficulty: u32) {
        let prefix = self.preimage_prefix();
        while !pow::meets_difficulty(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = Self::hash_with_nonce(&prefix, self.nonce);
        }
    }

    pub(crate) fn apply_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.hash = self.compute_hash();
    }

    /// Assign the back-link to the chain predecessor and reseal the hash so
    /// the block stays self-consistent. Called by the ledger at append time;
    /// the proof-of-work prefix applies to the pre-link hash.
    pub fn link_previous_hash(&mut self, prev: Hash) {
        self.previous_hash = prev;
        self.hash = self.compute_hash();
    }

    /// Direct mutable access to the transaction list. Does NOT rehash: a
    /// block whose transactions change through here will fail chain
    /// validation, which is exactly what tamper-detection demos rely on.
    pub fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }
}

pub mod pow {
    use super::Hash;

    /// Number of leading zero characters in the hex encoding of `hash`,
    /// counted without actually encoding (one hex character per nibble).
    pub fn leading_zero_hex_chars(hash: &Hash) -> u32 {
        let mut total = 0u32;
        for b in hash {
            if *b == 0 {
                total += 2;
            } else if b >> 4 == 0 {
                total += 1;
                break;
            } else {
                break;
            }
        }
        total
    }

    pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
        leading_zero_hex_chars(hash) >= difficulty
    }
}

pub mod chain {
    use super::*;
    use tracing::{info, warn};

    /// The chain manager: ordered blocks plus the pool of not-yet-mined
    /// transactions. Single-owner, in-memory; exclusive `&mut` access is the
    /// concurrency contract.
    pub struct Ledger {
        difficulty: u32,
        mining_reward: i64,
        pending_transactions: Vec<Transaction>,
        chain: Vec<Block>,
    }

    impl Ledger {
        pub fn new(difficulty: u32, mining_reward: i64) -> Self {
            Self {
                difficulty,
                mining_reward,
                pending_transactions: Vec::new(),
                chain: vec![genesis_block()],
            }
        }

        pub fn difficulty(&self) -> u32 {
            self.difficulty
        }

        pub fn mining_reward(&self) -> i64 {
            self.mining_reward
        }

        pub fn chain(&self) -> &[Block] {
            &self.chain
        }

        pub fn pending_transactions(&self) -> &[Transaction] {
            &self.pending_transactions
        }

        /// Mutable access to a block at `height`, for inspection and tamper
        /// demos. Normal operation never needs this.
        pub fn block_mut(&mut self, height: usize) -> Option<&mut Block> {
            self.chain.get_mut(height)
        }

        /// No validation: balances may go negative and identifiers may be
        /// anything, including empty.
        pub fn submit_transaction(&mut self, tx: Transaction) {
            self.pending_transactions.push(tx);
        }

        /// Package the pending pool (plus the miner's reward) into a block,
        /// run proof-of-work, link it to the tip and append it. Blocks the
        /// caller until a valid nonce is found. The pool is empty afterwards.
        pub fn mine_block(&mut self, miner_address: &str) -> Hash {
            self.pending_transactions
                .push(Transaction::new("", miner_address, self.mining_reward));
            let txs = std::mem::take(&mut self.pending_transactions);

            let mut block = Block::new(unix_now(), txs, ZERO_HASH);
            block.mine(self.difficulty);

            // Read the tip hash before appending, then reseal with the link.
            let tip = self.chain.last().expect("chain is never empty").hash();
            block.link_previous_hash(tip);

            let sealed = block.hash();
            info!(
                height = self.chain.len(),
                nonce = block.nonce(),
                hash = %block.hash_hex(),
                "mined block"
            );
            self.chain.push(block);
            sealed
        }

        /// Walk the chain from index 1, recomputing each block's hash and
        /// checking the back-link to its predecessor. Stops at the first
        /// mismatch. The genesis block is never re-derived.
        pub fn is_valid(&self) -> bool {
            for i in 1..self.chain.len() {
                let previous = &self.chain[i - 1];
                let current = &self.chain[i];
                if current.hash() != current.compute_hash() {
                    warn!(height = i, "stored hash does not match recomputed hash");
                    return false;
                }
                if current.previous_hash() != previous.hash() {
                    warn!(height = i, "previous-hash link is broken");
                    return false;
                }
            }
            true
        }

        /// Fold every transaction in chain order: debit `from`, credit `to`.
        /// A self-transfer hits both branches. Unknown addresses yield 0.
        pub fn balance_of(&self, address: &str) -> i64 {
            let mut balance = 0i64;
            for block in &self.chain {
                for tx in block.transactions() {
                    if tx.from == address {
                        balance -= tx.amount;
                    }
                    if tx.to == address {
                        balance += tx.amount;
                    }
                }
            }
            balance
        }
    }

    /// The unmined first block: a single placeholder transaction and the
    /// zero sentinel as previous hash.
    pub fn genesis_block() -> Block {
        Block::new(unix_now(), vec![Transaction::new("", "", 0)], ZERO_HASH)
    }
}
