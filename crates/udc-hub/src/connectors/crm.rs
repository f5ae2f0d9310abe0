//! # CRM Connector
//!
//! Customers, filterable by `status` and `customer_id`, searchable by name
//! and email.

use std::sync::Arc;

use udc_core::pipeline::{FetchRequest, PageLimits};
use udc_core::{ConnectorError, Customer, Record, RecordStore, Source};

use super::{fetch_page, Connector, ConnectorDescriptor, ConnectorPage};

pub struct CrmConnector {
    store: Arc<dyn RecordStore>,
    limits: PageLimits,
}

impl CrmConnector {
    pub fn new(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }
}

#[async_trait::async_trait]
impl Connector for CrmConnector {
    fn source(&self) -> Source {
        Source::Crm
    }

    fn descriptor(&self) -> ConnectorDescriptor {
        ConnectorDescriptor {
            source: Source::Crm,
            tool_name: "get_customers",
            description: "Retrieve CRM customers, newest first. Filter by status \
                          (active/inactive) or look up one customer by customer_id. \
                          Use query to search by name or email. Use when the user asks \
                          about customers or how many customers there are.",
            filters: Customer::FILTERS,
            supports_time_range: false,
            summary_tool: None,
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ConnectorPage, ConnectorError> {
        fetch_page::<Customer>(self.store.as_ref(), request, self.limits).await
    }
}
