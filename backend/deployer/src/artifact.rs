//! Compiled contract artifacts: bytecode plus the JSON ABI used to encode
//! follow-up calls.

use std::path::{Path, PathBuf};

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::hex;
use alloy::json_abi::JsonAbi;
use alloy::primitives::Bytes;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ArtifactError;
use crate::ledger::MethodCall;

/// Bytecode and interface of a compiled contract.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub bytecode: Bytes,
    pub abi: JsonAbi,
}

impl ContractArtifact {
    /// ABI-encode a call to `method`. Overloads are resolved by argument count.
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<MethodCall, ArtifactError> {
        let function = self
            .abi
            .function(method)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| ArtifactError::MissingMethod {
                method: method.to_string(),
                arity: args.len(),
            })?;

        let calldata = function
            .abi_encode_input(args)
            .map_err(|e| ArtifactError::Encoding {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        Ok(MethodCall {
            method: method.to_string(),
            calldata: calldata.into(),
        })
    }
}

/// Resolves a [`ContractArtifact`] from a named location.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<ContractArtifact, ArtifactError>;
}

/// Reads Foundry (`bytecode.object`) or Hardhat (`bytecode` string) JSON output.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileArtifactLoader;

#[derive(Deserialize)]
struct RawArtifact {
    abi: JsonAbi,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Object { object: String },
    Hex(String),
}

impl RawBytecode {
    fn as_hex(&self) -> &str {
        match self {
            Self::Object { object } => object,
            Self::Hex(hex) => hex,
        }
    }
}

#[async_trait]
impl ArtifactLoader for FileArtifactLoader {
    async fn load(&self, path: &Path) -> Result<ContractArtifact, ArtifactError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ArtifactError::NotFound {
                path: path.to_path_buf(),
                source,
            })?;
        let artifact = parse_artifact(path, &raw)?;
        debug!(
            "Loaded {} ({} bytes of bytecode, {} functions)",
            path.display(),
            artifact.bytecode.len(),
            artifact.abi.functions().count()
        );
        Ok(artifact)
    }
}

fn parse_artifact(path: &Path, raw: &str) -> Result<ContractArtifact, ArtifactError> {
    let malformed = |reason: String| ArtifactError::Malformed {
        path: PathBuf::from(path),
        reason,
    };

    let parsed: RawArtifact = serde_json::from_str(raw).map_err(|e| malformed(e.to_string()))?;
    let bytecode = hex::decode(parsed.bytecode.as_hex().trim())
        .map_err(|e| malformed(format!("bytecode is not valid hex: {e}")))?;
    if bytecode.is_empty() {
        return Err(malformed("bytecode is empty".to_string()));
    }

    Ok(ContractArtifact {
        bytecode: bytecode.into(),
        abi: parsed.abi,
    })
}
