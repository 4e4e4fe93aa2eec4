//! Canned requirement templates served for demos.

use crate::wire::TemplateResponse;

pub fn all() -> Vec<TemplateResponse> {
    vec![
        TemplateResponse {
            id: "notification_system",
            name: "Real-Time Notification System",
            description: "E-commerce notification system with push, email, SMS, and in-app channels",
            complexity: "complex",
            requirements: "Design a real-time notification system for an e-commerce platform.\n\n\
                Requirements:\n\
                - 50M registered users, 5M DAU\n\
                - Push notifications, email, SMS, in-app\n\
                - User preference management (opt-in/out per channel)\n\
                - Rate limiting to prevent notification fatigue\n\
                - Multi-region deployment (US, EU, Asia)\n\
                - Sub-500ms delivery for push notifications\n\
                - Event-driven architecture\n\
                - Delivery tracking and analytics",
        },
        TemplateResponse {
            id: "payment_gateway",
            name: "Payment Processing Gateway",
            description: "PCI-compliant payment gateway with multi-currency support",
            complexity: "complex",
            requirements: "Design a payment processing gateway for a marketplace platform.\n\n\
                Requirements:\n\
                - Process 10K transactions/minute at peak\n\
                - Support credit cards, debit cards, UPI, bank transfers\n\
                - Multi-currency (USD, EUR, GBP, INR)\n\
                - PCI DSS Level 1 compliance\n\
                - Idempotent transaction processing\n\
                - Split payments (marketplace takes commission)\n\
                - Real-time fraud detection\n\
                - Reconciliation and settlement system\n\
                - 99.99% uptime SLA",
        },
        TemplateResponse {
            id: "chat_platform",
            name: "Real-Time Chat Platform",
            description: "Scalable chat platform with group chats, media sharing, and E2E encryption",
            complexity: "medium",
            requirements: "Design a real-time chat platform similar to Slack/Discord.\n\n\
                Requirements:\n\
                - 1M concurrent users\n\
                - 1:1 and group chats (up to 500 members)\n\
                - Media sharing (images, files up to 100MB)\n\
                - Message search across history\n\
                - Read receipts and typing indicators\n\
                - End-to-end encryption for 1:1 chats\n\
                - Push notifications for offline users\n\
                - Message retention: 1 year",
        },
        TemplateResponse {
            id: "data_pipeline",
            name: "Real-Time Data Pipeline",
            description: "Event streaming pipeline for analytics with sub-second latency",
            complexity: "medium",
            requirements: "Design a real-time data pipeline for an analytics platform.\n\n\
                Requirements:\n\
                - Ingest 1M events/second from web and mobile clients\n\
                - Sub-second latency for real-time dashboards\n\
                - Batch processing for historical analysis\n\
                - Schema evolution support\n\
                - Data quality validation and dead-letter queues\n\
                - Multi-tenant isolation\n\
                - GDPR compliance (data deletion, export)\n\
                - 30-day hot storage, 2-year cold storage",
        },
    ]
}
