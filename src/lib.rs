/*!
# KPI Dashboard

A browser-based KPI dashboard, built in Rust.

## Overview

The user uploads an Excel spreadsheet (.xlsx or .xls); the server parses it,
infers a column schema, and serves summary metrics, KPI cards, four chart
panels and a descriptive-statistics table to a single interactive page.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- One static HTML page with a file uploader, metric cards, column selectors
  and four chart panels, talking to the backend over a small JSON/PNG API.

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Ingestion - Parses uploaded spreadsheets (calamine), truncates to the
    10,000-row ceiling and fingerprints the upload bytes
  - Schema Inference - Tags every column as numeric, text or unsupported
    once at load time
  - Aggregator - KPI totals/averages, top-10 grouped sums, descriptive
    statistics per numeric column
  - Chart Builders - Bar, line, histogram and pie charts rendered to PNG
    with plotters
  - Content Cache - Bounded, content-addressed caches for parsed tables and
    rendered charts
  - Session - The current table plus widget selections; handlers only
    recompute what their interaction changed

## Key Features

- Excel upload with row-limit truncation advisory
- KPI cards (total + average) over a user-chosen column subset
- Bar / line / histogram / pie chart panels with per-panel column selectors
- Summary statistics (count, mean, std, min, quartiles, max)
- 10-row data preview
- Non-fatal error handling: parse failures and empty-numeric data produce
  inline messages and the page stays interactive

## Modules

- **table**: the in-memory table, value model and schema inference
- **ingest**: spreadsheet parsing and upload fingerprinting
- **stats**: KPI, group-by and descriptive-statistics aggregation
- **charts**: the four chart builders (plotters)
- **cache**: bounded content-addressed caching
- **session**: per-session table and widget-selection state
- **error**: the failure taxonomy
- **app**: routing and request handlers

## REST API Endpoints

- `GET  /` - the dashboard page
- `POST /api/upload` - multipart spreadsheet upload
- `GET  /api/state` - metrics, schema, KPI cards, preview and statistics
- `POST /api/select` - update one widget selection
- `GET  /api/chart/{kind}` - render one chart panel as PNG
*/

pub mod app;
pub mod cache;
pub mod charts;
pub mod error;
pub mod ingest;
pub mod session;
pub mod stats;
pub mod table;

pub use error::DashboardError;
pub use ingest::LoadedTable;
pub use table::Table;
