//! Customer and supplier registry.

use std::sync::Arc;

use tracing::{info, instrument};

use karatbook_core::OrganizationId;
use karatbook_parties::{Party, PartyKind};

use crate::error::{ServiceResult, store_step};
use crate::records::{party_from_row, party_table, party_to_row};
use crate::store::{DataStore, Filter, WriteBatch};

#[derive(Clone)]
pub struct PartyService {
    store: Arc<dyn DataStore>,
}

impl PartyService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, party), fields(organization_id = %party.organization_id, kind = party.kind.as_str()), err)]
    pub async fn create_party(&self, party: Party) -> ServiceResult<Party> {
        let mut batch = WriteBatch::new();
        batch.insert(
            party_table(party.kind),
            party_to_row(&party).map_err(store_step("encode party"))?,
        );
        self.store
            .commit(batch)
            .await
            .map_err(store_step("insert party"))?;
        info!(party_id = %party.id, "party registered");
        Ok(party)
    }

    /// Parties ordered by name; customers before suppliers when `kind` is unset.
    pub async fn list_parties(
        &self,
        organization_id: OrganizationId,
        kind: Option<PartyKind>,
    ) -> ServiceResult<Vec<Party>> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => vec![PartyKind::Customer, PartyKind::Supplier],
        };

        let mut parties = Vec::new();
        for kind in kinds {
            let rows = self
                .store
                .select(
                    party_table(kind),
                    Filter::organization(organization_id).order_by("name"),
                )
                .await
                .map_err(store_step("load parties"))?;
            for row in rows {
                parties.push(party_from_row(kind, row).map_err(store_step("decode party"))?);
            }
        }
        Ok(parties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDataStore, Table};

    #[tokio::test]
    async fn parties_land_in_their_own_tables() {
        let store = Arc::new(InMemoryDataStore::new());
        let svc = PartyService::new(store.clone());
        let org = OrganizationId::new();

        for (kind, name) in [
            (PartyKind::Customer, "Zoya"),
            (PartyKind::Customer, "Asha"),
            (PartyKind::Supplier, "Kundan Karigar"),
        ] {
            svc.create_party(Party::register(org, kind, name, None).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(store.row_count(Table::Customers).unwrap(), 2);
        assert_eq!(store.row_count(Table::Suppliers).unwrap(), 1);

        let customers = svc.list_parties(org, Some(PartyKind::Customer)).await.unwrap();
        let names: Vec<_> = customers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Asha", "Zoya"]);

        let all = svc.list_parties(org, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].kind, PartyKind::Supplier);
        assert!(svc.list_parties(OrganizationId::new(), None).await.unwrap().is_empty());
    }
}
