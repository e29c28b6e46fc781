use anyhow::Result;

pub mod migrate;

#[allow(async_fn_in_trait)]
pub trait Command {
    type Output;

    async fn execute(self) -> Result<Self::Output>;
}
