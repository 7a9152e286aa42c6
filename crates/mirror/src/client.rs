use crate::{
    types::{
        AccountInfo, BlockResponse, BlocksResponse, ContractAction, ContractActionsResponse,
        ContractInfo, ContractResult, ContractResultsResponse, ContractStateEntry,
        ContractStateResponse, ExchangeRateResponse, LogEntry, LogsResponse, NetworkFeesResponse,
        OpcodesResponse, TokenInfo, TransactionDetail,
    },
    MirrorError, MirrorResult,
};
use async_trait::async_trait;
use relay_primitives::MirrorTimestamp;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, trace};
use url::Url;

/// Upper bound the mirror node accepts for `limit` query parameters.
const PAGE_LIMIT: u32 = 100;

/// Read access to the mirror node.
///
/// One method per REST endpoint the relay consumes. Absence (HTTP 404, or an
/// empty listing) is expressed in the return type; only transport and server
/// failures surface as [`MirrorError`].
#[async_trait]
pub trait MirrorClient: Debug + Send + Sync {
    /// `blocks/{ref}` — a block by number or `0x` hash.
    async fn block_by_ref(&self, block_ref: &str) -> MirrorResult<Option<BlockResponse>>;

    /// `blocks?limit=1&order=desc` — the most recent block.
    async fn latest_block(&self) -> MirrorResult<Option<BlockResponse>>;

    /// `contracts/results/{id}` — a contract result by Ethereum hash or
    /// transaction id.
    async fn contract_result(&self, id: &str) -> MirrorResult<Option<ContractResult>>;

    /// `contracts/results/{id}/actions` — the execution action trace.
    async fn contract_result_actions(&self, id: &str)
        -> MirrorResult<Option<Vec<ContractAction>>>;

    /// `contracts/results/{id}/opcodes` — the opcode-level trace, with
    /// memory/stack/storage detail toggled by the flags.
    async fn contract_result_opcodes(
        &self,
        id: &str,
        memory: bool,
        stack: bool,
        storage: bool,
    ) -> MirrorResult<Option<OpcodesResponse>>;

    /// `contracts/results?timestamp=gte:…&timestamp=lte:…` — all contract
    /// results in the closed timestamp interval, ascending.
    async fn contract_results_in_range(
        &self,
        from: MirrorTimestamp,
        to: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractResult>>;

    /// `contracts/results/logs?transaction.hash={hash}` — logs emitted under
    /// an Ethereum transaction hash.
    async fn logs_by_transaction_hash(&self, hash: &str) -> MirrorResult<Vec<LogEntry>>;

    /// `contracts/results/logs?timestamp=gte:…&timestamp=lte:…` — logs in the
    /// closed timestamp interval, ascending.
    async fn logs_in_range(
        &self,
        from: MirrorTimestamp,
        to: MirrorTimestamp,
    ) -> MirrorResult<Vec<LogEntry>>;

    /// `contracts/{addr}` — contract metadata by EVM address or entity id.
    async fn contract(&self, address: &str) -> MirrorResult<Option<ContractInfo>>;

    /// `accounts/{addr}?transactions=false` — account metadata.
    async fn account(&self, address: &str) -> MirrorResult<Option<AccountInfo>>;

    /// `balances?account.id={addr}[&timestamp=lte:…]` — tinybar balance,
    /// optionally at a historical timestamp.
    async fn balance_at(
        &self,
        address: &str,
        at: Option<MirrorTimestamp>,
    ) -> MirrorResult<Option<i64>>;

    /// `contracts/{id}/state?timestamp=…` — storage slots at a timestamp.
    async fn contract_state_at(
        &self,
        address: &str,
        at: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractStateEntry>>;

    /// `network/fees` — current gas fee schedule.
    async fn network_fees(&self) -> MirrorResult<Option<NetworkFeesResponse>>;

    /// `network/exchangerate` — the HBAR/cent exchange rate.
    async fn exchange_rate(&self) -> MirrorResult<Option<ExchangeRateResponse>>;

    /// `tokens/{id}` — token metadata.
    async fn token(&self, id: &str) -> MirrorResult<Option<TokenInfo>>;

    /// `transactions/{id}` — the fee-bearing transaction record.
    async fn transaction_by_id(&self, id: &str) -> MirrorResult<Option<TransactionDetail>>;
}

/// [`MirrorClient`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpMirrorClient {
    http: reqwest::Client,
    base: Url,
}

// === impl HttpMirrorClient ===

impl HttpMirrorClient {
    /// Creates a client against `base_url`, e.g.
    /// `https://testnet.mirrornode.hedera.com`.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        // normalize so path joins below cannot clobber a base path
        let base = Url::parse(&format!("{}/api/v1/", base_url.trim_end_matches('/')))?;
        Ok(Self { http: reqwest::Client::new(), base })
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> MirrorResult<Option<T>> {
        let url = self
            .base
            .join(path_and_query)
            .map_err(|e| MirrorError::Transport(e.to_string()))?;
        trace!(target: "mirror", %url, "GET");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MirrorError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(target: "mirror", %url, "not found");
            return Ok(None)
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Status {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            })
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| MirrorError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MirrorClient for HttpMirrorClient {
    async fn block_by_ref(&self, block_ref: &str) -> MirrorResult<Option<BlockResponse>> {
        self.get_json(&format!("blocks/{block_ref}")).await
    }

    async fn latest_block(&self) -> MirrorResult<Option<BlockResponse>> {
        let page: Option<BlocksResponse> = self.get_json("blocks?limit=1&order=desc").await?;
        Ok(page.and_then(|p| p.blocks.into_iter().next()))
    }

    async fn contract_result(&self, id: &str) -> MirrorResult<Option<ContractResult>> {
        self.get_json(&format!("contracts/results/{id}")).await
    }

    async fn contract_result_actions(
        &self,
        id: &str,
    ) -> MirrorResult<Option<Vec<ContractAction>>> {
        let page: Option<ContractActionsResponse> =
            self.get_json(&format!("contracts/results/{id}/actions")).await?;
        Ok(page.map(|p| p.actions))
    }

    async fn contract_result_opcodes(
        &self,
        id: &str,
        memory: bool,
        stack: bool,
        storage: bool,
    ) -> MirrorResult<Option<OpcodesResponse>> {
        self.get_json(&format!(
            "contracts/results/{id}/opcodes?memory={memory}&stack={stack}&storage={storage}"
        ))
        .await
    }

    async fn contract_results_in_range(
        &self,
        from: MirrorTimestamp,
        to: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractResult>> {
        let page: Option<ContractResultsResponse> = self
            .get_json(&format!(
                "contracts/results?timestamp=gte:{from}&timestamp=lte:{to}&limit={PAGE_LIMIT}&order=asc"
            ))
            .await?;
        Ok(page.map(|p| p.results).unwrap_or_default())
    }

    async fn logs_by_transaction_hash(&self, hash: &str) -> MirrorResult<Vec<LogEntry>> {
        let page: Option<LogsResponse> = self
            .get_json(&format!(
                "contracts/results/logs?transaction.hash={hash}&limit={PAGE_LIMIT}&order=asc"
            ))
            .await?;
        Ok(page.map(|p| p.logs).unwrap_or_default())
    }

    async fn logs_in_range(
        &self,
        from: MirrorTimestamp,
        to: MirrorTimestamp,
    ) -> MirrorResult<Vec<LogEntry>> {
        let page: Option<LogsResponse> = self
            .get_json(&format!(
                "contracts/results/logs?timestamp=gte:{from}&timestamp=lte:{to}&limit={PAGE_LIMIT}&order=asc"
            ))
            .await?;
        Ok(page.map(|p| p.logs).unwrap_or_default())
    }

    async fn contract(&self, address: &str) -> MirrorResult<Option<ContractInfo>> {
        self.get_json(&format!("contracts/{address}")).await
    }

    async fn account(&self, address: &str) -> MirrorResult<Option<AccountInfo>> {
        self.get_json(&format!("accounts/{address}?transactions=false")).await
    }

    async fn balance_at(
        &self,
        address: &str,
        at: Option<MirrorTimestamp>,
    ) -> MirrorResult<Option<i64>> {
        let query = match at {
            Some(at) => format!("balances?account.id={address}&timestamp=lte:{at}"),
            None => format!("balances?account.id={address}"),
        };
        let page: Option<crate::types::BalancesResponse> = self.get_json(&query).await?;
        Ok(page.and_then(|p| p.balances.into_iter().next().map(|b| b.balance)))
    }

    async fn contract_state_at(
        &self,
        address: &str,
        at: MirrorTimestamp,
    ) -> MirrorResult<Vec<ContractStateEntry>> {
        let page: Option<ContractStateResponse> = self
            .get_json(&format!(
                "contracts/{address}/state?timestamp={at}&limit={PAGE_LIMIT}&order=desc"
            ))
            .await?;
        Ok(page.map(|p| p.state).unwrap_or_default())
    }

    async fn network_fees(&self) -> MirrorResult<Option<NetworkFeesResponse>> {
        self.get_json("network/fees").await
    }

    async fn exchange_rate(&self) -> MirrorResult<Option<ExchangeRateResponse>> {
        self.get_json("network/exchangerate").await
    }

    async fn token(&self, id: &str) -> MirrorResult<Option<TokenInfo>> {
        self.get_json(&format!("tokens/{id}")).await
    }

    async fn transaction_by_id(&self, id: &str) -> MirrorResult<Option<TransactionDetail>> {
        let page: Option<crate::types::TransactionsResponse> =
            self.get_json(&format!("transactions/{id}")).await?;
        Ok(page.and_then(|p| p.transactions.into_iter().next()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_normalization() {
        let client = HttpMirrorClient::new("https://testnet.mirrornode.hedera.com/").unwrap();
        assert_eq!(client.base.as_str(), "https://testnet.mirrornode.hedera.com/api/v1/");

        let joined = client.base.join("blocks/17").unwrap();
        assert_eq!(joined.as_str(), "https://testnet.mirrornode.hedera.com/api/v1/blocks/17");
    }
}
