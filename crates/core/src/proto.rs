//! Protobuf messages for the `mine` package.
//!
//! The schema is reconstructed from how the game client and server use each
//! call; field numbers are assigned in declaration order. Both services share
//! it.

#![allow(missing_docs)]

/// Fully-qualified name of the unauthenticated service.
pub const PUBLIC_SERVICE: &str = "mine.MinePublicService";
/// Fully-qualified name of the authenticated service.
pub const PRIVATE_SERVICE: &str = "mine.MinePrivateService";

// Auth

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub session_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterResponse {
    #[prost(string, tag = "1")]
    pub session_token: String,
}

// Community

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHiscoresRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HiscoreEntry {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(float, tag = "2")]
    pub total_value: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHiscoresResponse {
    #[prost(message, repeated, tag = "1")]
    pub hiscores: Vec<HiscoreEntry>,
}

// Items

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ItemDescriptor {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
    #[prost(uint32, tag = "4")]
    pub rarity_tier: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ItemModifier {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(float, tag = "2")]
    pub value: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Item {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(message, repeated, tag = "2")]
    pub modifiers: Vec<ItemModifier>,
    #[prost(float, tag = "3")]
    pub quality: f32,
    #[prost(float, tag = "4")]
    pub value: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetItemDescriptorsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetItemDescriptorsResponse {
    #[prost(message, repeated, tag = "1")]
    pub item_descriptors: Vec<ItemDescriptor>,
}

// Locations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LocationDescriptor {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MineLocation {
    #[prost(message, optional, tag = "1")]
    pub descriptor: Option<LocationDescriptor>,
    #[prost(bool, tag = "2")]
    pub is_available: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GambleLocation {
    #[prost(message, optional, tag = "1")]
    pub descriptor: Option<LocationDescriptor>,
    #[prost(bool, tag = "2")]
    pub is_available: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMineLocationsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMineLocationsResponse {
    #[prost(message, repeated, tag = "1")]
    pub mine_locations: Vec<MineLocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetGambleLocationsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetGambleLocationsResponse {
    #[prost(message, repeated, tag = "1")]
    pub gamble_locations: Vec<GambleLocation>,
}

// Account

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserAccountInfo {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub username: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAccountRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub user_account_info: Option<UserAccountInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SortBy {
    DateAcquired = 0,
    RarityTier = 1,
    Value = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SortDirection {
    Ascending = 0,
    Descending = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInventoryRequest {
    #[prost(uint32, tag = "1")]
    pub page_size: u32,
    #[prost(uint32, tag = "2")]
    pub page_number: u32,
    #[prost(enumeration = "SortBy", tag = "3")]
    pub sort_by: i32,
    #[prost(enumeration = "SortDirection", tag = "4")]
    pub sort_direction: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetInventoryResponse {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<Item>,
    #[prost(uint32, tag = "2")]
    pub total_items: u32,
}

// Base

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Upgrades {
    #[prost(uint32, tag = "1")]
    pub storage_level: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBaseRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBaseResponse {
    #[prost(message, optional, tag = "1")]
    pub upgrades: Option<Upgrades>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum UpgradeType {
    Storage = 0,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpgradeBaseRequest {
    #[prost(enumeration = "UpgradeType", tag = "1")]
    pub upgrade_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpgradeBaseResponse {
    #[prost(message, optional, tag = "1")]
    pub upgrades: Option<Upgrades>,
}

// Gameplay

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartMiningRequest {
    #[prost(string, tag = "1")]
    pub location_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartMiningResponse {
    #[prost(message, optional, tag = "1")]
    pub loot: Option<Item>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopMiningRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopMiningResponse {}
