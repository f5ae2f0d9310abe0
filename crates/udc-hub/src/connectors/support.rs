//! # Support Connector

use std::sync::Arc;

use udc_core::pipeline::{FetchRequest, PageLimits};
use udc_core::{ConnectorError, Record, RecordStore, Source, SupportTicket};

use super::{fetch_page, Connector, ConnectorDescriptor, ConnectorPage};

pub struct SupportConnector {
    store: Arc<dyn RecordStore>,
    limits: PageLimits,
}

impl SupportConnector {
    pub fn new(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }
}

#[async_trait::async_trait]
impl Connector for SupportConnector {
    fn source(&self) -> Source {
        Source::Support
    }

    fn descriptor(&self) -> ConnectorDescriptor {
        ConnectorDescriptor {
            source: Source::Support,
            tool_name: "get_support_tickets",
            description: "Retrieve support tickets, newest first. Filter by status \
                          (open/closed/pending), priority (low/medium/high), customer_id \
                          or ticket_id. Use query to search subjects and descriptions.",
            filters: SupportTicket::FILTERS,
            supports_time_range: false,
            summary_tool: None,
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<ConnectorPage, ConnectorError> {
        fetch_page::<SupportTicket>(self.store.as_ref(), request, self.limits).await
    }
}
