//! Helius DAS response shapes and the compressed-NFT view model derived from them.
//!
//! Fields the gateway relies on are required, so a compressed asset missing them
//! fails to decode instead of producing half-empty records further down. Owner
//! pages are screened on the raw JSON first, so uncompressed entries never
//! reach the typed decode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNNAMED_ASSET: &str = "Unnamed cNFT";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-nft.png";

const ACCOUNT_KEY_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DasAsset {
    pub id: String,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub authorities: Option<Vec<Authority>>,
    #[serde(default)]
    pub compression: Option<Compression>,
    #[serde(default)]
    pub grouping: Option<Vec<Group>>,
    #[serde(default)]
    pub royalty: Option<Royalty>,
    #[serde(default)]
    pub creators: Option<Vec<Creator>>,
    pub ownership: Ownership,
    #[serde(default)]
    pub supply: Option<Supply>,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub burnt: bool,
}

impl DasAsset {
    pub fn is_compressed(&self) -> bool {
        self.compression.as_ref().is_some_and(|c| c.compressed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "$schema", default)]
    pub schema: String,
    #[serde(default)]
    pub json_uri: String,
    #[serde(default)]
    pub files: Option<Vec<File>>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Option<Vec<Attribute>>,
}

/// One trait entry. Values are usually strings but numbers occur in the wild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authority {
    pub address: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compression {
    #[serde(default)]
    pub eligible: bool,
    pub compressed: bool,
    #[serde(default)]
    pub data_hash: String,
    #[serde(default)]
    pub creator_hash: String,
    #[serde(default)]
    pub asset_hash: String,
    pub tree: String,
    #[serde(default)]
    pub seq: u64,
    pub leaf_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_key: String,
    pub group_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Royalty {
    pub royalty_model: String,
    pub target: Option<String>,
    pub percent: f64,
    pub basis_points: u32,
    pub primary_sale_happened: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub address: String,
    pub share: u8,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ownership {
    pub frozen: bool,
    pub delegated: bool,
    pub delegate: Option<String>,
    pub ownership_model: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub print_max_supply: Option<u64>,
    pub print_current_supply: u64,
    pub edition_nonce: Option<u64>,
}

/// Page returned by `getAssetsByOwner`. Only `items` is consumed, and it stays
/// untyped until [`compressed_nfts`] has picked out the compressed entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProof {
    pub root: String,
    pub proof: Vec<String>,
    pub node_index: u64,
    pub leaf: String,
    pub tree_id: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProofAccountError {
    #[error("proof node {index} is not valid base58: {reason}")]
    InvalidEncoding { index: usize, reason: String },
    #[error("proof node {index} decodes to {len} bytes, expected 32")]
    InvalidLength { index: usize, len: usize },
}

impl AssetProof {
    /// Sibling hashes decoded into 32-byte account keys, leaf to root, ready
    /// to be appended as remaining accounts of a Bubblegum instruction.
    pub fn proof_accounts(&self) -> Result<Vec<[u8; ACCOUNT_KEY_BYTES]>, ProofAccountError> {
        self.proof
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let bytes = bs58::decode(node).into_vec().map_err(|err| {
                    ProofAccountError::InvalidEncoding {
                        index,
                        reason: err.to_string(),
                    }
                })?;
                <[u8; ACCOUNT_KEY_BYTES]>::try_from(bytes.as_slice()).map_err(|_| {
                    ProofAccountError::InvalidLength {
                        index,
                        len: bytes.len(),
                    }
                })
            })
            .collect()
    }
}

/// Trimmed-down asset as the fractionalization UI consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedNft {
    pub id: String,
    pub mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
    pub tree: String,
    pub leaf_id: u64,
    pub owner: String,
}

impl CompressedNft {
    /// Maps a compressed asset; returns `None` for anything not marked compressed.
    pub fn from_asset(asset: &DasAsset) -> Option<Self> {
        let compression = asset.compression.as_ref().filter(|c| c.compressed)?;
        let content = asset.content.as_ref();
        let metadata = content.and_then(|c| c.metadata.as_ref());

        let image = content
            .and_then(|c| c.links.as_ref())
            .and_then(|links| non_empty(links.image.as_deref()))
            .or_else(|| {
                content
                    .and_then(|c| c.files.as_ref())
                    .and_then(|files| files.first())
                    .and_then(|file| non_empty(file.uri.as_deref()))
            })
            .unwrap_or(PLACEHOLDER_IMAGE);

        let name = metadata
            .and_then(|m| non_empty(m.name.as_deref()))
            .unwrap_or(UNNAMED_ASSET);
        let symbol = metadata.and_then(|m| m.symbol.as_deref()).unwrap_or("");

        Some(Self {
            id: asset.id.clone(),
            mint: asset.id.clone(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: metadata.and_then(|m| m.description.clone()),
            image: image.to_string(),
            attributes: metadata.and_then(|m| m.attributes.clone()),
            tree: compression.tree.clone(),
            leaf_id: compression.leaf_id,
            owner: asset.ownership.owner.clone(),
        })
    }
}

/// Keeps compressed assets only, in upstream order. Entries not marked
/// `compression.compressed == true` are dropped before decoding, whatever
/// else they lack.
pub fn compressed_nfts(items: &[Value]) -> Result<Vec<CompressedNft>, serde_json::Error> {
    items
        .iter()
        .filter(|item| is_marked_compressed(item))
        .map(|item| {
            let asset = DasAsset::deserialize(item)?;
            Ok(CompressedNft::from_asset(&asset))
        })
        .filter_map(Result::transpose)
        .collect()
}

fn is_marked_compressed(item: &Value) -> bool {
    item.pointer("/compression/compressed").and_then(Value::as_bool) == Some(true)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
