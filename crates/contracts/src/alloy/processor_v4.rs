//! Processor that charges fees either from a signed quote or from its
//! standard fee schedule.

crate::bindings!(OrderProcessorV4 {
    struct Order {
        uint64 requestTimestamp;
        address recipient;
        address assetToken;
        address paymentToken;
        bool sell;
        uint8 orderType;
        uint256 assetTokenQuantity;
        uint256 paymentTokenQuantity;
        uint256 price;
        uint8 tif;
    }

    struct FeeQuote {
        uint256 orderId;
        address requester;
        uint256 fee;
        uint64 timestamp;
        uint64 deadline;
    }

    event OrderCreated(uint256 indexed id, address indexed requester, Order order, uint256 feesEscrowed);
    event OrderFill(uint256 indexed id, address indexed paymentToken, address indexed assetToken, address requester, uint256 assetAmount, uint256 paymentAmount, uint256 feesTaken, bool sell);
    event OrderFulfilled(uint256 indexed id, address indexed requester);
    event CancelRequested(uint256 indexed id, address indexed requester);
    event OrderCancelled(uint256 indexed id, address indexed requester, string reason);

    function createOrder(Order calldata order, FeeQuote calldata feeQuote, bytes calldata feeQuoteSignature) external returns (uint256 id);
    function createOrderStandardFees(Order calldata order) external returns (uint256 id);
    function requestCancel(uint256 id) external;
    function getOrderStatus(uint256 id) external view returns (uint8);
    function getUnfilledAmount(uint256 id) external view returns (uint256);
    function getReceivedAmount(uint256 id) external view returns (uint256);
    function orderDecimalReduction(address token) external view returns (uint8);
    function totalStandardFee(bool sell, address paymentToken, uint256 paymentTokenQuantity) external view returns (uint256);

    function selfPermit(address token, address owner, uint256 value, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
    function multicall(bytes[] calldata data) external returns (bytes[] memory results);
});
