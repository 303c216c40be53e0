use tracing::info;

use numora_types::api::CreateOfferRequest;
use numora_types::models::Offer;
use numora_types::{LedgerError, Result};

use crate::rows::{self, OFFER_COLUMNS};
use crate::{Database, new_id, non_empty, now, required, ts};

impl Database {
    pub fn create_offer(&self, req: &CreateOfferRequest) -> Result<Offer> {
        let offer = Offer {
            id: new_id(),
            title: required(&req.title, "title")?,
            description: non_empty(req.description.as_deref()),
            image_url: non_empty(req.image_url.as_deref()),
            priority: req.priority.unwrap_or(0),
            is_active: true,
            created_at: now(),
        };

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO offers (id, title, description, image_url, priority, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    offer.id,
                    offer.title,
                    offer.description,
                    offer.image_url,
                    offer.priority,
                    offer.is_active,
                    ts(&offer.created_at),
                ],
            )?;
            Ok(())
        })?;

        info!("Offer {} created (priority {})", offer.id, offer.priority);
        Ok(offer)
    }

    pub fn set_offer_active(&self, id: &str, is_active: bool) -> Result<Offer> {
        let offer = self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE offers SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![is_active, id],
            )?;
            if updated == 0 {
                return Err(LedgerError::not_found("offer", id));
            }

            Ok(tx.query_row(
                &format!("SELECT {} FROM offers WHERE id = ?1", OFFER_COLUMNS),
                [id],
                rows::offer,
            )?)
        })?;

        info!("Offer {} is_active={}", id, is_active);
        Ok(offer)
    }

    pub fn delete_offer(&self, id: &str) -> Result<()> {
        let removed =
            self.with_tx(|tx| Ok(tx.execute("DELETE FROM offers WHERE id = ?1", [id])?))?;
        if removed == 0 {
            return Err(LedgerError::not_found("offer", id));
        }

        info!("Offer {} deleted", id);
        Ok(())
    }

    /// Highest priority first, newest first within a priority.
    pub fn list_offers(&self) -> Result<Vec<Offer>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM offers ORDER BY priority DESC, created_at DESC, rowid DESC",
                OFFER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], rows::offer)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
