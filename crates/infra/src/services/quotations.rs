//! Quotation lifecycle: create, confirm, reject, delete, queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glassbill_auth::{IdentityContext, TenantContext};
use glassbill_core::{
    Aggregate, AggregateRoot, CustomerId, DocumentKind, ExpectedVersion, QuotationId,
};
use glassbill_events::EventBus;
use glassbill_quotations::{
    ConfirmQuotation, CreateQuotation, DeleteQuotation, Quotation, QuotationCommand,
    QuotationDraft, QuotationItemInput, QuotationStatus, RejectQuotation,
};
use glassbill_tax::{BillingType, Charges};

use super::{BillingService, load_owned};
use crate::audit::{BillingEnvelope, QUOTATION_AGGREGATE};
use crate::error::{ErrorKind, ServiceResult};

/// Request to quote a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuotation {
    pub customer_id: CustomerId,
    pub billing_type: BillingType,
    pub items: Vec<QuotationItemInput>,
    #[serde(default)]
    pub charges: Charges,
    /// Required for GST quotations, ignored for NON_GST.
    pub tax_percentage: Option<Decimal>,
    /// Defaults to today.
    pub quotation_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
}

fn newest_first(quotations: &mut [Quotation]) {
    quotations.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.number().cmp(&a.number()))
    });
}

impl<B> BillingService<B>
where
    B: EventBus<BillingEnvelope>,
{
    /// Price the items, allocate a `QTN-` number and store a DRAFT.
    ///
    /// The draft is priced before a number is allocated, so validation
    /// failures never consume a number.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = tracing::field::Empty, customer_id = %request.customer_id)
    )]
    pub fn create_quotation(
        &self,
        identity: &IdentityContext,
        request: NewQuotation,
    ) -> ServiceResult<Quotation> {
        let ctx = self.tenant(identity)?;
        let customer = load_owned(&*self.customers, &request.customer_id, ctx.tenant_id())?;

        let draft = QuotationDraft {
            customer: customer.snapshot(),
            billing_type: request.billing_type,
            items: request.items,
            charges: request.charges,
            tax_percentage: request.tax_percentage,
            quotation_date: request.quotation_date.unwrap_or_else(|| self.clock.today()),
            valid_until: request.valid_until,
        };
        let pricing = draft.price(ctx.supplier_state())?;
        tracing::debug!(
            subtotal = %pricing.subtotal,
            taxable_base = %pricing.tax.taxable_base,
            tax_amount = %pricing.tax.tax_amount,
            grand_total = %pricing.tax.grand_total,
            supply = ?pricing.tax.supply,
            "quotation priced"
        );

        let number = self.numbering.next(ctx.tenant_id(), DocumentKind::Quotation)?;
        let quotation_id = QuotationId::new();
        let mut quotation = Quotation::empty(quotation_id);
        let events = quotation.execute(&QuotationCommand::CreateQuotation(CreateQuotation {
            tenant_id: ctx.tenant_id(),
            quotation_id,
            number,
            draft,
            supplier_state: ctx.supplier_state().map(str::to_string),
            created_by: ctx.actor().to_string(),
            occurred_at: self.clock.now(),
        }))?;
        self.quotations
            .save(quotation.clone(), ExpectedVersion::NoRecord)?;

        tracing::info!(
            %quotation_id,
            number = ?quotation.number().map(|n| n.as_str()),
            grand_total = %quotation.grand_total(),
            "quotation created"
        );
        self.publish(ctx.tenant_id(), quotation_id, QUOTATION_AGGREGATE, 0, events);
        Ok(quotation)
    }

    /// DRAFT → CONFIRMED.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %quotation_id))]
    pub fn confirm_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
    ) -> ServiceResult<Quotation> {
        let ctx = self.tenant(identity)?;
        self.transition(&ctx, quotation_id, "confirm", |ctx, occurred_at| {
            QuotationCommand::ConfirmQuotation(ConfirmQuotation {
                tenant_id: ctx.tenant_id(),
                quotation_id,
                actor: ctx.actor().to_string(),
                occurred_at,
            })
        })
    }

    /// DRAFT → REJECTED; `reason` must not be blank.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %quotation_id))]
    pub fn reject_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
        reason: &str,
    ) -> ServiceResult<Quotation> {
        let ctx = self.tenant(identity)?;
        self.transition(&ctx, quotation_id, "reject", |ctx, occurred_at| {
            QuotationCommand::RejectQuotation(RejectQuotation {
                tenant_id: ctx.tenant_id(),
                quotation_id,
                actor: ctx.actor().to_string(),
                reason: reason.to_string(),
                occurred_at,
            })
        })
    }

    /// Remove a DRAFT together with its items. Its number stays used.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %quotation_id))]
    pub fn delete_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
    ) -> ServiceResult<()> {
        let ctx = self.tenant(identity)?;
        self.transition(&ctx, quotation_id, "delete", |ctx, occurred_at| {
            QuotationCommand::DeleteQuotation(DeleteQuotation {
                tenant_id: ctx.tenant_id(),
                quotation_id,
                actor: ctx.actor().to_string(),
                occurred_at,
            })
        })
        .map(|_| ())
    }

    /// Load, decide and write one status change, re-deciding on a stale write
    /// so that of two racing transitions exactly one wins.
    fn transition(
        &self,
        ctx: &TenantContext,
        quotation_id: QuotationId,
        action: &'static str,
        command: impl Fn(&TenantContext, DateTime<Utc>) -> QuotationCommand,
    ) -> ServiceResult<Quotation> {
        let result = self.with_write_retry(action, || {
            let mut quotation = load_owned(&*self.quotations, &quotation_id, ctx.tenant_id())?;
            let base_version = quotation.version();
            let events = quotation.execute(&command(ctx, self.clock.now()))?;

            if quotation.is_deleted() {
                self.quotations
                    .delete(&quotation_id, ExpectedVersion::Exact(base_version))?;
            } else {
                self.quotations
                    .save(quotation.clone(), ExpectedVersion::Exact(base_version))?;
            }

            self.publish(ctx.tenant_id(), quotation_id, QUOTATION_AGGREGATE, base_version, events);
            Ok(quotation)
        });

        match &result {
            Ok(quotation) => tracing::info!(action, status = ?quotation.status(), "quotation updated"),
            Err(e) if e.kind() == ErrorKind::InvalidState => {
                tracing::warn!(action, error = %e, "quotation transition rejected");
            }
            Err(_) => {}
        }
        result
    }

    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %quotation_id))]
    pub fn get_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
    ) -> ServiceResult<Quotation> {
        let ctx = self.tenant(identity)?;
        load_owned(&*self.quotations, &quotation_id, ctx.tenant_id())
    }

    /// The caller's quotations, newest first.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty))]
    pub fn list_quotations(&self, identity: &IdentityContext) -> ServiceResult<Vec<Quotation>> {
        let ctx = self.tenant(identity)?;
        let mut quotations = self.quotations.list(ctx.tenant_id())?;
        newest_first(&mut quotations);
        Ok(quotations)
    }

    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, ?status))]
    pub fn list_quotations_by_status(
        &self,
        identity: &IdentityContext,
        status: QuotationStatus,
    ) -> ServiceResult<Vec<Quotation>> {
        let mut quotations = self.list_quotations(identity)?;
        quotations.retain(|q| q.status() == status);
        Ok(quotations)
    }

    /// Render a stored quotation as-is.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %quotation_id))]
    pub fn render_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
    ) -> ServiceResult<Vec<u8>> {
        let ctx = self.tenant(identity)?;
        let quotation = load_owned(&*self.quotations, &quotation_id, ctx.tenant_id())?;
        Ok(self.renderer.render_quotation(&quotation)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use glassbill_core::Money;
    use glassbill_parties::CustomerDetails;
    use glassbill_quotations::DimensionUnit;
    use glassbill_tax::SupplyKind;
    use rust_decimal_macros::dec;

    use crate::services::test_support::{TestService, fixture};

    /// 10ft x 10ft clear glass at 10/sq.ft.
    pub(crate) fn sheet() -> QuotationItemInput {
        QuotationItemInput {
            glass_type: "Clear Float".to_string(),
            thickness: Some("5mm".to_string()),
            design: None,
            description: None,
            height: dec!(10),
            height_unit: DimensionUnit::Feet,
            width: dec!(10),
            width_unit: DimensionUnit::Feet,
            quantity: 1,
            rate_per_sq_ft: dec!(10),
            hsn_code: Some("7005".to_string()),
        }
    }

    /// Subtotal 1000, installation 100, transport 50, discount 50, GST 18%.
    pub(crate) fn request(customer_id: CustomerId) -> NewQuotation {
        NewQuotation {
            customer_id,
            billing_type: BillingType::Gst,
            items: vec![sheet()],
            charges: Charges {
                installation_charge: Money::new(dec!(100)),
                transport_charge: Money::new(dec!(50)),
                discount: Money::new(dec!(50)),
            },
            tax_percentage: Some(dec!(18)),
            quotation_date: None,
            valid_until: None,
        }
    }

    pub(crate) fn customer_in(
        service: &TestService,
        identity: &IdentityContext,
        state: &str,
    ) -> CustomerId {
        let customer = service
            .register_customer(
                identity,
                CustomerDetails {
                    state: Some(state.to_string()),
                    gstin: Some("27abcde1234f1z5".to_string()),
                    ..CustomerDetails::named("Meera Patil")
                },
            )
            .unwrap();
        *customer.id()
    }

    #[test]
    fn create_prices_numbers_and_snapshots() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "maharashtra ");

        let q = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();
        assert_eq!(q.number().unwrap().as_str(), "QTN-2024-01-0001");
        assert_eq!(q.status(), QuotationStatus::Draft);
        assert_eq!(q.quotation_date(), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(q.created_by(), Some("asha"));

        let tax = q.tax().unwrap();
        assert_eq!(tax.supply, SupplyKind::IntraState);
        assert_eq!(tax.taxable_base, Money::new(dec!(1100)));
        assert_eq!(tax.cgst, Money::new(dec!(99)));
        assert_eq!(tax.sgst, Money::new(dec!(99)));
        assert_eq!(tax.igst, Money::zero());
        assert_eq!(q.grand_total(), Money::new(dec!(1298)));
        assert_eq!(q.customer().unwrap().gstin.as_deref(), Some("27ABCDE1234F1Z5"));
    }

    #[test]
    fn invalid_drafts_do_not_consume_numbers() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");

        let mut bad = request(customer_id);
        bad.charges.discount = Money::new(dec!(5000));
        let err = f.service.create_quotation(&f.shop_a, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDiscount);

        let mut bad = request(customer_id);
        bad.tax_percentage = Some(dec!(120));
        let err = f.service.create_quotation(&f.shop_a, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTaxRate);

        let mut bad = request(customer_id);
        bad.items[0].quantity = 0;
        let err = f.service.create_quotation(&f.shop_a, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut bad = request(customer_id);
        bad.items[0].height = Decimal::from(10u64.pow(17));
        bad.items[0].width = Decimal::from(10u64.pow(17));
        let err = f.service.create_quotation(&f.shop_a, bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let q = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();
        assert_eq!(q.number().unwrap().as_str(), "QTN-2024-01-0001");
    }

    #[test]
    fn cannot_quote_another_shops_customer() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let err = f
            .service
            .create_quotation(&f.shop_b, request(customer_id))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossTenantAccess);
    }

    #[test]
    fn confirm_twice_is_invalid_state() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let q = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();

        let confirmed = f.service.confirm_quotation(&f.shop_a, *q.id()).unwrap();
        assert_eq!(confirmed.status(), QuotationStatus::Confirmed);
        assert_eq!(confirmed.confirmed_by(), Some("asha"));

        let err = f.service.confirm_quotation(&f.shop_a, *q.id()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = f
            .service
            .reject_quotation(&f.shop_a, *q.id(), "too late")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn reject_requires_reason_and_is_terminal() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let q = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();

        let err = f.service.reject_quotation(&f.shop_a, *q.id(), "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let rejected = f
            .service
            .reject_quotation(&f.shop_a, *q.id(), "Customer chose tempered glass")
            .unwrap();
        assert_eq!(rejected.status(), QuotationStatus::Rejected);
        assert_eq!(rejected.rejection_reason(), Some("Customer chose tempered glass"));

        let err = f.service.delete_quotation(&f.shop_a, *q.id()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn deleted_draft_is_gone_and_its_number_is_not_reused() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let first = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();

        let err = f.service.delete_quotation(&f.shop_b, *first.id()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossTenantAccess);

        f.service.delete_quotation(&f.shop_a, *first.id()).unwrap();
        let err = f.service.get_quotation(&f.shop_a, *first.id()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let second = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();
        assert_eq!(second.number().unwrap().as_str(), "QTN-2024-01-0002");
    }

    #[test]
    fn listings_are_newest_first_and_filterable() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let first = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();
        f.clock.set(Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap());
        let second = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();
        f.service.confirm_quotation(&f.shop_a, *first.id()).unwrap();

        let all: Vec<_> = f
            .service
            .list_quotations(&f.shop_a)
            .unwrap()
            .iter()
            .map(|q| *q.id())
            .collect();
        assert_eq!(all, vec![*second.id(), *first.id()]);

        let confirmed = f
            .service
            .list_quotations_by_status(&f.shop_a, QuotationStatus::Confirmed)
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id(), first.id());
        assert!(f.service.list_quotations(&f.shop_b).unwrap().is_empty());
    }

    #[test]
    fn render_hands_over_the_stored_figures() {
        let f = fixture();
        let customer_id = customer_in(&f.service, &f.shop_a, "Maharashtra");
        let q = f
            .service
            .create_quotation(&f.shop_a, request(customer_id))
            .unwrap();

        let bytes = f.service.render_quotation(&f.shop_a, *q.id()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("QTN-2024-01-0001"));
        assert!(text.contains("Grand total: 1298.00"));

        let err = f.service.render_quotation(&f.shop_b, *q.id()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrossTenantAccess);
    }
}
