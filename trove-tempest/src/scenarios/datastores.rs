use anyhow::{ensure, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::harness::{Attr, Case, Fixture, Suite, SuiteContext};

pub fn suite() -> Suite {
    Suite {
        name: "DatabaseDatastoresTest",
        fixture: Fixture::Bare,
        skip: None,
        cases: vec![Case {
            name: "test_datastores",
            idempotent_id: "e4cdcadf-51bc-41ec-8cc6-530a3da08d10",
            attrs: &[Attr::Smoke],
            run: test_datastores,
        }],
    }
}

fn test_datastores(ctx: &mut SuiteContext) -> BoxFuture<'_, Result<()>> {
    async move {
        let datastores = ctx.clients.datastores.list_db_datastores().await?;
        ensure!(!datastores.is_empty(), "No available datastores found");
        Ok(())
    }
    .boxed()
}
