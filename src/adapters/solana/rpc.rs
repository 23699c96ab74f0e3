//! Solana RPC Transaction Source
//!
//! Implements the monitor's `TransactionSource` port on top of the blocking
//! `RpcClient`, bridged with `spawn_blocking`. Transactions come back JSON
//! encoded and are flattened into the neutral `RawTransaction` shape the
//! classifier consumes.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use solana_client::rpc_client::{GetConfirmedSignaturesForAddress2Config, RpcClient};
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiMessage,
    UiTransactionEncoding,
};

use crate::ports::{RawInstruction, RawTransaction, SignatureInfo, SourceError, TransactionSource};

/// RPC-backed transaction source
#[derive(Clone)]
pub struct RpcTransactionSource {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcTransactionSource {
    pub fn new(rpc_url: String, commitment: &str) -> Self {
        let commitment = parse_commitment(commitment);
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self { client, commitment }
    }
}

fn parse_commitment(level: &str) -> CommitmentConfig {
    match level {
        "processed" => CommitmentConfig::processed(),
        "finalized" => CommitmentConfig::finalized(),
        // Config validation already restricted the set
        _ => CommitmentConfig::confirmed(),
    }
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, SourceError> {
        let pubkey = Pubkey::from_str(address)
            .map_err(|e| SourceError::InvalidAddress(format!("{address}: {e}")))?;

        let client = Arc::clone(&self.client);
        let commitment = self.commitment;
        let statuses = tokio::task::spawn_blocking(move || {
            client
                .get_signatures_for_address_with_config(
                    &pubkey,
                    GetConfirmedSignaturesForAddress2Config {
                        before: None,
                        until: None,
                        limit: Some(limit),
                        commitment: Some(commitment),
                    },
                )
                .map_err(|e| SourceError::Rpc(e.to_string()))
        })
        .await
        .map_err(|e| SourceError::Rpc(format!("Task join error: {e}")))??;

        // RPC already orders newest first
        Ok(statuses
            .into_iter()
            .map(|s| SignatureInfo {
                signature: s.signature,
                slot: s.slot,
            })
            .collect())
    }

    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<RawTransaction>, SourceError> {
        let parsed = Signature::from_str(signature)
            .map_err(|e| SourceError::InvalidSignature(format!("{signature}: {e}")))?;

        let client = Arc::clone(&self.client);
        let commitment = self.commitment;
        let result = tokio::task::spawn_blocking(move || {
            client.get_transaction_with_config(
                &parsed,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::Json),
                    commitment: Some(commitment),
                    max_supported_transaction_version: Some(0),
                },
            )
        })
        .await
        .map_err(|e| SourceError::Rpc(format!("Task join error: {e}")))?;

        match result {
            Ok(encoded) => flatten_transaction(signature, encoded).map(Some),
            // Nodes report unknown signatures as an error; the monitor
            // retries the signature on its next pass
            Err(e) if e.to_string().contains("not found") => Ok(None),
            Err(e) => Err(SourceError::Rpc(e.to_string())),
        }
    }
}

/// Flatten the encoded RPC response into the classifier's neutral shape
fn flatten_transaction(
    signature: &str,
    encoded: EncodedConfirmedTransactionWithStatusMeta,
) -> Result<RawTransaction, SourceError> {
    let meta = encoded
        .transaction
        .meta
        .ok_or_else(|| SourceError::Malformed(format!("{signature}: missing meta")))?;

    let message = match encoded.transaction.transaction {
        EncodedTransaction::Json(ui_tx) => match ui_tx.message {
            UiMessage::Raw(raw) => raw,
            UiMessage::Parsed(_) => {
                return Err(SourceError::Malformed(format!(
                    "{signature}: unexpected parsed-message encoding"
                )))
            }
        },
        _ => {
            return Err(SourceError::Malformed(format!(
                "{signature}: unexpected transaction encoding"
            )))
        }
    };

    let instructions = message
        .instructions
        .iter()
        .map(|ix| RawInstruction {
            program_id: message
                .account_keys
                .get(ix.program_id_index as usize)
                .cloned()
                .unwrap_or_default(),
            accounts: ix
                .accounts
                .iter()
                .filter_map(|&i| message.account_keys.get(i as usize).cloned())
                .collect(),
            data: ix.data.clone(),
        })
        .collect();

    Ok(RawTransaction {
        signature: signature.to_string(),
        success: meta.err.is_none(),
        account_keys: message.account_keys,
        instructions,
        log_messages: Option::from(meta.log_messages).unwrap_or_default(),
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        block_time: encoded.block_time,
    })
}
