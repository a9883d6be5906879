use std::{collections::HashMap, sync::Arc};

use tracing::warn;

use crate::proto::{self, ItemDescriptor, LocationDescriptor, UserAccountInfo};

/// A world location together with its server-computed availability.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Static description.
    pub descriptor: LocationDescriptor,
    /// Whether the player may use this location now.
    pub is_available: bool,
}

impl Location {
    fn project(
        kind: &str,
        descriptor: Option<LocationDescriptor>,
        is_available: bool,
    ) -> Option<Self> {
        match descriptor {
            Some(descriptor) => Some(Self {
                descriptor,
                is_available,
            }),
            None => {
                warn!("skipping {kind} location without descriptor");
                None
            }
        }
    }

    /// Project wire mine locations, dropping entries without a descriptor.
    pub fn from_mine(locations: Vec<proto::MineLocation>) -> Vec<Self> {
        locations
            .into_iter()
            .filter_map(|loc| Self::project("mine", loc.descriptor, loc.is_available))
            .collect()
    }

    /// Project wire gamble locations, dropping entries without a descriptor.
    pub fn from_gamble(locations: Vec<proto::GambleLocation>) -> Vec<Self> {
        locations
            .into_iter()
            .filter_map(|loc| Self::project("gamble", loc.descriptor, loc.is_available))
            .collect()
    }
}

/// Progress of one background location load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    /// Not finished, or not started yet.
    #[default]
    Pending,
    /// Merged into the state.
    Loaded,
    /// Reported and left absent from the state.
    Failed,
}

impl LoadStatus {
    /// True once the load has finished either way.
    pub fn is_settled(self) -> bool {
        self != LoadStatus::Pending
    }
}

/// Progress of both background location loads of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationLoads {
    /// Mine locations.
    pub mine: LoadStatus,
    /// Gamble locations.
    pub gamble: LoadStatus,
}

impl LocationLoads {
    /// True once neither load is pending.
    pub fn is_settled(&self) -> bool {
        self.mine.is_settled() && self.gamble.is_settled()
    }
}

/// Item catalog and account snapshot, published together or not at all.
#[derive(Debug, Clone)]
struct FirstScreen {
    items: Arc<Vec<ItemDescriptor>>,
    items_by_id: Arc<HashMap<u32, ItemDescriptor>>,
    account_info: Arc<UserAccountInfo>,
}

/// Everything the player currently sees.
///
/// Values are never mutated once published: every `with_*` method returns a
/// new state that shares unchanged fields with `self`.
#[derive(Debug, Clone, Default)]
pub struct GlobalAppState {
    first_screen: Option<FirstScreen>,
    mine_locations: Option<Arc<Vec<Location>>>,
    gamble_locations: Option<Arc<Vec<Location>>>,
}

impl GlobalAppState {
    /// True once the item catalog and account info are present.
    pub fn is_loaded(&self) -> bool {
        self.first_screen.is_some()
    }

    /// Item catalog in server order.
    pub fn items(&self) -> Option<&[ItemDescriptor]> {
        self.first_screen.as_ref().map(|s| s.items.as_slice())
    }

    /// Item catalog indexed by id.
    pub fn items_by_id(&self) -> Option<&HashMap<u32, ItemDescriptor>> {
        self.first_screen.as_ref().map(|s| s.items_by_id.as_ref())
    }

    /// Look up a catalog entry by id.
    pub fn item(&self, id: u32) -> Option<&ItemDescriptor> {
        self.items_by_id().and_then(|index| index.get(&id))
    }

    /// Account of the logged-in player.
    pub fn account_info(&self) -> Option<&UserAccountInfo> {
        self.first_screen.as_ref().map(|s| s.account_info.as_ref())
    }

    /// `None` until the mine locations are merged.
    pub fn mine_locations(&self) -> Option<&[Location]> {
        self.mine_locations.as_deref().map(Vec::as_slice)
    }

    /// `None` until the gamble locations are merged.
    pub fn gamble_locations(&self) -> Option<&[Location]> {
        self.gamble_locations.as_deref().map(Vec::as_slice)
    }

    /// Set the catalog (indexing it by id) and the account info in one step.
    pub fn with_first_screen(
        &self,
        items: Vec<ItemDescriptor>,
        account_info: UserAccountInfo,
    ) -> Self {
        let mut items_by_id = HashMap::with_capacity(items.len());
        for item in &items {
            if items_by_id.insert(item.id, item.clone()).is_some() {
                warn!(id = item.id, "duplicate item id in catalog; keeping the later entry");
            }
        }

        Self {
            first_screen: Some(FirstScreen {
                items: Arc::new(items),
                items_by_id: Arc::new(items_by_id),
                account_info: Arc::new(account_info),
            }),
            ..self.clone()
        }
    }

    /// Set the mine locations, keeping every other field.
    pub fn with_mine_locations(&self, locations: Vec<Location>) -> Self {
        Self {
            mine_locations: Some(Arc::new(locations)),
            ..self.clone()
        }
    }

    /// Set the gamble locations, keeping every other field.
    pub fn with_gamble_locations(&self, locations: Vec<Location>) -> Self {
        Self {
            gamble_locations: Some(Arc::new(locations)),
            ..self.clone()
        }
    }
}
