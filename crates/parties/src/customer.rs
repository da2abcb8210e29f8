use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glassbill_core::{
    Aggregate, AggregateRoot, CustomerId, DomainError, DomainResult, TenantId, TenantOwned,
};
use glassbill_events::Event;

/// Editable customer fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    /// GST registration number.
    pub gstin: Option<String>,
}

impl CustomerDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        if let Some(mobile) = self.mobile.as_deref().filter(|m| !m.is_empty()) {
            if !mobile.chars().all(|c| c.is_ascii_digit() || c == '+') {
                return Err(DomainError::validation(format!("invalid mobile number '{mobile}'")));
            }
        }
        if let Some(gstin) = self.gstin.as_deref().filter(|g| !g.is_empty()) {
            if gstin.len() != 15 || !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(DomainError::validation(format!("invalid GSTIN '{gstin}'")));
            }
        }
        Ok(())
    }

    fn normalized(&self) -> Self {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            name: self.name.trim().to_string(),
            mobile: clean(&self.mobile),
            email: clean(&self.email),
            address: clean(&self.address),
            city: clean(&self.city),
            state: clean(&self.state),
            pincode: clean(&self.pincode),
            gstin: clean(&self.gstin).map(|g| g.to_uppercase()),
        }
    }
}

/// Customer fields frozen onto a quotation or invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub customer_id: CustomerId,
    pub name: String,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub state: Option<String>,
}

/// Aggregate root: Customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: CustomerId,
    tenant_id: Option<TenantId>,
    details: CustomerDetails,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Customer {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: CustomerId) -> Self {
        Self {
            id,
            tenant_id: None,
            details: CustomerDetails::default(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn details(&self) -> &CustomerDetails {
        &self.details
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Copy of the fields a legal document must keep even if the customer is
    /// edited later.
    pub fn snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            customer_id: self.id,
            name: self.details.name.clone(),
            mobile: self.details.mobile.clone(),
            address: self.details.address.clone(),
            gstin: self.details.gstin.clone(),
            state: self.details.state.clone(),
        }
    }
}

impl AggregateRoot for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantOwned for Customer {
    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

/// Command: RegisterCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub details: CustomerDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCustomer. Replaces every editable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCustomer {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub details: CustomerDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerCommand {
    RegisterCustomer(RegisterCustomer),
    UpdateCustomer(UpdateCustomer),
}

/// Event: CustomerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub details: CustomerDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub details: CustomerDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    CustomerRegistered(CustomerRegistered),
    CustomerUpdated(CustomerUpdated),
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered(_) => "billing.customer.registered",
            CustomerEvent::CustomerUpdated(_) => "billing.customer.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.occurred_at,
            CustomerEvent::CustomerUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Customer {
    type Command = CustomerCommand;
    type Event = CustomerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CustomerEvent::CustomerRegistered(e) => {
                self.id = e.customer_id;
                self.tenant_id = Some(e.tenant_id);
                self.details = e.details.clone();
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            CustomerEvent::CustomerUpdated(e) => {
                self.details = e.details.clone();
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::RegisterCustomer(cmd) => self.handle_register(cmd),
            CustomerCommand::UpdateCustomer(cmd) => self.handle_update(cmd),
        }
    }
}

impl Customer {
    fn handle_register(&self, cmd: &RegisterCustomer) -> DomainResult<Vec<CustomerEvent>> {
        if self.created {
            return Err(DomainError::conflict("customer already exists"));
        }
        let details = cmd.details.normalized();
        details.validate()?;

        Ok(vec![CustomerEvent::CustomerRegistered(CustomerRegistered {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCustomer) -> DomainResult<Vec<CustomerEvent>> {
        if !self.created || self.id != cmd.customer_id {
            return Err(DomainError::not_found());
        }
        self.ensure_owned_by(cmd.tenant_id)?;

        let details = cmd.details.normalized();
        details.validate()?;

        Ok(vec![CustomerEvent::CustomerUpdated(CustomerUpdated {
            tenant_id: cmd.tenant_id,
            customer_id: cmd.customer_id,
            details,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn details() -> CustomerDetails {
        CustomerDetails {
            name: "  Ravi Glass Works ".to_string(),
            mobile: Some("9876543210".to_string()),
            email: Some(String::new()),
            address: Some("12 MG Road".to_string()),
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            pincode: Some("411001".to_string()),
            gstin: Some("27aapfu0939f1zv".to_string()),
        }
    }

    fn registered(tenant_id: TenantId) -> Customer {
        let id = CustomerId::new();
        let mut customer = Customer::empty(id);
        customer
            .execute(&CustomerCommand::RegisterCustomer(RegisterCustomer {
                tenant_id,
                customer_id: id,
                details: details(),
                occurred_at: test_time(),
            }))
            .unwrap();
        customer
    }

    #[test]
    fn register_normalizes_details() {
        let tenant_id = test_tenant_id();
        let customer = registered(tenant_id);

        assert_eq!(customer.name(), "Ravi Glass Works");
        assert_eq!(customer.details().email, None);
        assert_eq!(customer.details().gstin.as_deref(), Some("27AAPFU0939F1ZV"));
        assert_eq!(customer.tenant_id(), Some(tenant_id));
        assert_eq!(customer.version(), 1);
    }

    #[test]
    fn register_rejects_empty_name_and_bad_gstin() {
        let customer = Customer::empty(CustomerId::new());
        let mut cmd = RegisterCustomer {
            tenant_id: test_tenant_id(),
            customer_id: *customer.id(),
            details: CustomerDetails::named("   "),
            occurred_at: test_time(),
        };

        let err = customer
            .handle(&CustomerCommand::RegisterCustomer(cmd.clone()))
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }

        cmd.details = CustomerDetails {
            gstin: Some("SHORT".to_string()),
            ..CustomerDetails::named("Asha")
        };
        let err = customer
            .handle(&CustomerCommand::RegisterCustomer(cmd))
            .unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("GSTIN") => {}
            _ => panic!("Expected Validation error for GSTIN"),
        }
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let tenant_id = test_tenant_id();
        let mut customer = registered(tenant_id);
        let snapshot = customer.snapshot();

        customer
            .execute(&CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id,
                customer_id: *customer.id(),
                details: CustomerDetails {
                    state: Some("Gujarat".to_string()),
                    ..CustomerDetails::named("Ravi Glass & Mirrors")
                },
                occurred_at: test_time(),
            }))
            .unwrap();

        assert_eq!(customer.name(), "Ravi Glass & Mirrors");
        assert_eq!(snapshot.name, "Ravi Glass Works");
        assert_eq!(snapshot.state.as_deref(), Some("Maharashtra"));
        assert_eq!(customer.version(), 2);
    }

    #[test]
    fn update_from_other_tenant_is_cross_tenant_access() {
        let customer = registered(test_tenant_id());

        let err = customer
            .handle(&CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id: test_tenant_id(),
                customer_id: *customer.id(),
                details: CustomerDetails::named("Intruder"),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::CrossTenantAccess);
    }

    #[test]
    fn update_of_unknown_customer_is_not_found() {
        let customer = Customer::empty(CustomerId::new());

        let err = customer
            .handle(&CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id: test_tenant_id(),
                customer_id: *customer.id(),
                details: CustomerDetails::named("Nobody"),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn duplicate_registration_is_a_conflict() {
        let tenant_id = test_tenant_id();
        let customer = registered(tenant_id);

        let err = customer
            .handle(&CustomerCommand::RegisterCustomer(RegisterCustomer {
                tenant_id,
                customer_id: *customer.id(),
                details: details(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for duplicate registration"),
        }
    }
}
