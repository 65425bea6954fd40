use fxgate_core::{ConversionResult, RateProvider};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::cli::ConvertArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ConvertResponseData {
    #[serde(flatten)]
    conversion: ConversionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<RequestedAmount>,
}

#[derive(Debug, Serialize)]
struct RequestedAmount {
    amount: Decimal,
    converted: Decimal,
}

pub async fn run(args: &ConvertArgs, provider: &dyn RateProvider) -> Result<Value, CliError> {
    let conversion = provider.convert(&args.from, &args.to).await?;
    let requested = args.amount.map(|amount| RequestedAmount {
        amount,
        converted: conversion.convert(amount),
    });

    Ok(serde_json::to_value(ConvertResponseData {
        conversion,
        requested,
    })?)
}
