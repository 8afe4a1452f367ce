//! Smart-account mock, scripted chain fake and event helpers shared by the
//! unit tests.

use async_trait::async_trait;
use mockall::mock;
use relay_account::{RelayError, SmartAccountInterface};
use relay_delivery::{DeliveryError, DeliveryInterface};
use relay_types::{
	Address, Bytes, ConfigSchema, InitCode, OperationRequest, ProviderFailure, RelayEvent, Schema,
	Transaction, TransactionHash, TransactionReceipt, ValidationError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

mock! {
	pub SmartAccount {}

	#[async_trait]
	impl SmartAccountInterface for SmartAccount {
		fn config_schema(&self) -> Box<dyn ConfigSchema>;
		async fn initialize(&self) -> Result<(), RelayError>;
		fn is_ready(&self) -> bool;
		fn address(&self) -> Result<Address, RelayError>;
		fn init_code(&self) -> Result<Option<InitCode>, RelayError>;
		async fn send_operation(
			&self,
			request: OperationRequest,
		) -> Result<TransactionHash, RelayError>;
	}
}

/// Scripted answer to one receipt lookup.
#[derive(Debug, Clone)]
pub enum Lookup {
	NotMined,
	Found,
	Fail(i64),
	/// Never answers.
	Hang,
}

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Single-chain fake whose receipt lookups follow a per-hash script.
///
/// Unscripted lookups answer "not mined". Submissions return the configured
/// result and are recorded.
pub struct ScriptedChain {
	chain_id: u64,
	block: AtomicU64,
	block_fails: AtomicBool,
	scripts: Mutex<HashMap<TransactionHash, VecDeque<Lookup>>>,
	lookups: Mutex<HashMap<TransactionHash, usize>>,
	nonce: AtomicU64,
	nonce_reads: AtomicU64,
	code: Mutex<Bytes>,
	slow_reads: AtomicBool,
	submit_result: Mutex<Result<TransactionHash, ProviderFailure>>,
	submitted: Mutex<Vec<Transaction>>,
}

impl ScriptedChain {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			block: AtomicU64::new(0),
			block_fails: AtomicBool::new(false),
			scripts: Mutex::new(HashMap::new()),
			lookups: Mutex::new(HashMap::new()),
			nonce: AtomicU64::new(0),
			nonce_reads: AtomicU64::new(0),
			code: Mutex::new(Bytes::new()),
			slow_reads: AtomicBool::new(false),
			submit_result: Mutex::new(Ok(TransactionHash(vec![0xee; 32]))),
			submitted: Mutex::new(Vec::new()),
		}
	}

	pub fn set_block(&self, block: u64) {
		self.block.store(block, Ordering::SeqCst);
	}

	pub fn fail_block_number(&self) {
		self.block_fails.store(true, Ordering::SeqCst);
	}

	pub fn script(&self, hash: &TransactionHash, steps: impl IntoIterator<Item = Lookup>) {
		self.scripts
			.lock()
			.unwrap()
			.insert(hash.clone(), steps.into_iter().collect());
	}

	pub fn lookups(&self, hash: &TransactionHash) -> usize {
		self.lookups.lock().unwrap().get(hash).copied().unwrap_or(0)
	}

	pub fn set_nonce(&self, nonce: u64) {
		self.nonce.store(nonce, Ordering::SeqCst);
	}

	pub fn nonce_reads(&self) -> u64 {
		self.nonce_reads.load(Ordering::SeqCst)
	}

	pub fn set_code(&self, code: Bytes) {
		*self.code.lock().unwrap() = code;
	}

	/// Makes nonce and code lookups hang.
	pub fn slow_reads(&self) {
		self.slow_reads.store(true, Ordering::SeqCst);
	}

	pub fn set_submit_result(&self, result: Result<TransactionHash, ProviderFailure>) {
		*self.submit_result.lock().unwrap() = result;
	}

	pub fn submitted(&self) -> Vec<Transaction> {
		self.submitted.lock().unwrap().clone()
	}

	async fn maybe_hang(&self) {
		if self.slow_reads.load(Ordering::SeqCst) {
			std::future::pending::<()>().await;
		}
	}
}

#[async_trait]
impl DeliveryInterface for ScriptedChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	fn chain_ids(&self) -> Vec<u64> {
		vec![self.chain_id]
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		self.submitted.lock().unwrap().push(tx);
		self.submit_result
			.lock()
			.unwrap()
			.clone()
			.map_err(DeliveryError::Rpc)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
		_chain_id: u64,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		*self.lookups.lock().unwrap().entry(hash.clone()).or_default() += 1;
		let step = self
			.scripts
			.lock()
			.unwrap()
			.get_mut(hash)
			.and_then(|steps| steps.pop_front())
			.unwrap_or(Lookup::NotMined);

		match step {
			Lookup::NotMined => Ok(None),
			Lookup::Found => Ok(Some(TransactionReceipt {
				hash: hash.clone(),
				block_number: self.block.load(Ordering::SeqCst),
				success: true,
			})),
			Lookup::Fail(code) => Err(DeliveryError::Rpc(ProviderFailure::new(
				Some(code),
				"internal error",
			))),
			Lookup::Hang => std::future::pending().await,
		}
	}

	async fn get_block_number(&self, _chain_id: u64) -> Result<u64, DeliveryError> {
		if self.block_fails.load(Ordering::SeqCst) {
			return Err(DeliveryError::Network("connection refused".into()));
		}
		Ok(self.block.load(Ordering::SeqCst))
	}

	async fn get_nonce(&self, _address: Address, _chain_id: u64) -> Result<u64, DeliveryError> {
		self.maybe_hang().await;
		self.nonce_reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.nonce.load(Ordering::SeqCst))
	}

	async fn get_code(&self, _address: Address, _chain_id: u64) -> Result<Bytes, DeliveryError> {
		self.maybe_hang().await;
		Ok(self.code.lock().unwrap().clone())
	}
}

/// Everything published so far, without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<RelayEvent>) -> Vec<RelayEvent> {
	let mut events = Vec::new();
	while let Ok(event) = rx.try_recv() {
		events.push(event);
	}
	events
}
