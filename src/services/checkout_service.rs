use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::error::{AppError, AppResult, CheckoutError};
use crate::external::{
    CheckoutSessionParams, PaymentGateway, PriceParams, append_session_placeholder,
};
use crate::models::{CheckoutSessionResponse, ConfirmCheckoutResponse, CreateCheckoutRequest};
use crate::repositories::{PostRepository, PurchaseRepository};

pub const METADATA_USER_ID: &str = "userId";
pub const METADATA_POST_ID: &str = "postId";

#[derive(Clone)]
pub struct CheckoutService {
    posts: PostRepository,
    purchases: PurchaseRepository,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl CheckoutService {
    pub fn new(db: DatabaseConnection, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        Self {
            posts: PostRepository::new(db.clone()),
            purchases: PurchaseRepository::new(db),
            gateway,
        }
    }

    fn gateway(&self) -> AppResult<&Arc<dyn PaymentGateway>> {
        self.gateway
            .as_ref()
            .ok_or(AppError::Unavailable("CHECKOUT_UNAVAILABLE"))
    }

    pub async fn create_session_for_post(
        &self,
        user_id: &str,
        request: &CreateCheckoutRequest,
    ) -> AppResult<CheckoutSessionResponse> {
        let gateway = self.gateway()?;

        let post = self
            .posts
            .find_published_by_id(&request.post_id)
            .await?
            .ok_or(CheckoutError::PostNotFound)?;
        if !post.is_paid {
            return Err(CheckoutError::PostIsFree.into());
        }
        if self
            .purchases
            .find_by_user_and_post(user_id, &post.id)
            .await?
            .is_some()
        {
            return Err(CheckoutError::AlreadyPurchased.into());
        }

        let price = gateway
            .ensure_price(&PriceParams {
                post_id: post.id.clone(),
                title: post.title.clone(),
                amount_jpy: post.price_jpy,
                product_id: post.stripe_product_id.clone(),
                price_id: post.stripe_price_id.clone(),
                current_amount: post.stripe_price_amount,
            })
            .await?;

        let changed = post.stripe_product_id.as_deref() != Some(price.product_id.as_str())
            || post.stripe_price_id.as_deref() != Some(price.price_id.as_str())
            || post.stripe_price_amount != Some(post.price_jpy);
        let post = if changed {
            let amount = post.price_jpy;
            self.posts
                .update_stripe_references(post, &price.product_id, &price.price_id, amount)
                .await?
        } else {
            post
        };

        let metadata = HashMap::from([
            (METADATA_USER_ID.to_string(), user_id.to_string()),
            (METADATA_POST_ID.to_string(), post.id.clone()),
        ]);
        let session = gateway
            .create_checkout_session(&CheckoutSessionParams {
                price_id: price.price_id,
                success_url: append_session_placeholder(&request.success_url),
                cancel_url: request.cancel_url.clone(),
                metadata,
            })
            .await?;

        log::info!(
            "Checkout session {} created for user {} and post {}",
            session.id,
            user_id,
            post.id
        );
        Ok(CheckoutSessionResponse {
            url: session.url,
            session_id: session.id,
        })
    }

    pub async fn confirm_session(&self, session_id: &str, user_id: &str) -> AppResult<ConfirmCheckoutResponse> {
        let gateway = self.gateway()?;

        let session = gateway
            .retrieve_checkout_session(session_id)
            .await?
            .filter(|s| s.is_payment_mode())
            .ok_or(CheckoutError::SessionNotFound)?;
        if !session.is_paid() {
            return Err(CheckoutError::SessionNotPaid.into());
        }

        let post_id = match (
            session.metadata_value(METADATA_USER_ID),
            session.metadata_value(METADATA_POST_ID),
        ) {
            (Some(owner), Some(post_id)) if owner == user_id => post_id.to_string(),
            _ => return Err(CheckoutError::SessionMetadataMismatch.into()),
        };

        let post = self
            .posts
            .find_published_by_id(&post_id)
            .await?
            .ok_or(CheckoutError::PostNotFound)?;

        if self
            .purchases
            .find_by_user_and_post(user_id, &post.id)
            .await?
            .is_some()
        {
            return Ok(ConfirmCheckoutResponse {
                ok: true,
                already_owned: true,
            });
        }

        self.purchases
            .create_purchase(user_id, &post.id, &session.id)
            .await?;
        log::info!("Purchase recorded from session {} for user {}", session.id, user_id);

        Ok(ConfirmCheckoutResponse {
            ok: true,
            already_owned: false,
        })
    }
}
